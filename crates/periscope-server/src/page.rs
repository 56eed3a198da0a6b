//! Landing page rendering.
//!
//! One HTML page, branded from settings, that embeds the noVNC client in an
//! iframe and shows a loading/error overlay around it. Six placeholder
//! substitutions; a template engine would be overkill.

use periscope_settings::GatewaySettings;

/// Landing page template. `{{...}}` placeholders are replaced verbatim.
const PAGE_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
    <title>{{service_name}}</title>
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <style>
        * { box-sizing: border-box; margin: 0; padding: 0; }

        body {
            background: linear-gradient(135deg, {{bg_start}} 0%, {{bg_end}} 100%);
            color: white;
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, 'Helvetica Neue', Arial, sans-serif;
            height: 100vh;
            overflow: hidden;
        }

        .header {
            background: rgba(0,0,0,0.4);
            padding: 12px 20px;
            display: flex;
            justify-content: space-between;
            align-items: center;
            border-bottom: 1px solid rgba(255,255,255,0.1);
        }

        .service-info h1 {
            font-size: 22px;
            font-weight: 600;
            color: {{primary_color}};
        }

        .service-info p {
            font-size: 13px;
            margin-top: 3px;
            opacity: 0.85;
        }

        .status-controls { display: flex; gap: 15px; align-items: center; }

        .status-item {
            display: flex;
            align-items: center;
            gap: 8px;
            padding: 6px 12px;
            background: rgba(255,255,255,0.1);
            border-radius: 15px;
            font-size: 13px;
        }

        .status-dot {
            width: 8px;
            height: 8px;
            border-radius: 50%;
            background: {{primary_color}};
        }

        .control-btn {
            background: rgba(255,255,255,0.1);
            border: 1px solid rgba(255,255,255,0.2);
            color: white;
            padding: 6px 12px;
            border-radius: 6px;
            font-size: 12px;
            cursor: pointer;
        }

        .control-btn:hover { background: rgba(255,255,255,0.2); }

        .main-container {
            height: calc(100vh - 57px);
            position: relative;
            background: #000;
        }

        .vnc-frame { width: 100%; height: 100%; border: none; background: #000; }

        .loading-overlay {
            position: absolute;
            inset: 0;
            background: rgba(0,0,0,0.85);
            display: flex;
            flex-direction: column;
            justify-content: center;
            align-items: center;
        }

        .spinner {
            width: 48px;
            height: 48px;
            border: 3px solid rgba(255,255,255,0.2);
            border-top: 3px solid {{primary_color}};
            border-radius: 50%;
            animation: spin 1s linear infinite;
            margin-bottom: 24px;
        }

        @keyframes spin { to { transform: rotate(360deg); } }

        .error-state {
            display: none;
            flex-direction: column;
            justify-content: center;
            align-items: center;
            height: 100%;
            text-align: center;
            padding: 40px;
        }

        .error-state.visible { display: flex; }

        .error-title { font-size: 18px; font-weight: 600; margin-bottom: 8px; color: #ff6b6b; }

        .error-message { font-size: 14px; opacity: 0.8; margin-bottom: 20px; max-width: 400px; }
    </style>
</head>
<body>
    <div class="header">
        <div class="service-info">
            <h1>{{service_name}}</h1>
            <p>{{service_description}}</p>
        </div>
        <div class="status-controls">
            <div class="status-item">
                <div class="status-dot"></div>
                <span>Session Ready</span>
            </div>
            <button class="control-btn" onclick="toggleFullscreen()">Fullscreen</button>
            <button class="control-btn" onclick="reloadVNC()">Reload</button>
        </div>
    </div>

    <div class="main-container">
        <div id="loading" class="loading-overlay">
            <div class="spinner"></div>
            <div>Connecting to remote desktop...</div>
        </div>

        <div id="error" class="error-state">
            <div class="error-title">Connection Failed</div>
            <div class="error-message">
                Unable to reach the remote desktop. The VNC service may still be starting up.
            </div>
            <button class="control-btn" onclick="reloadVNC()">Try Again</button>
        </div>

        <iframe id="vnc-frame" class="vnc-frame" style="display: none;"></iframe>
    </div>

    <script>
        let vncLoadTimeout;

        function initializeVNC() {
            const frame = document.getElementById('vnc-frame');
            const loading = document.getElementById('loading');
            const error = document.getElementById('error');

            loading.style.display = 'flex';
            error.classList.remove('visible');
            frame.style.display = 'none';

            // window.location.hostname resolves to the container IP,
            // not localhost, when accessed through a tunnel.
            const vncUrl = 'http://' + window.location.hostname + ':{{novnc_port}}/vnc.html?autoconnect=true&resize=scale';
            frame.src = vncUrl;

            vncLoadTimeout = setTimeout(() => {
                if (frame.style.display === 'none') {
                    showError();
                }
            }, 15000);

            frame.onload = function() {
                clearTimeout(vncLoadTimeout);
                setTimeout(() => {
                    loading.style.display = 'none';
                    frame.style.display = 'block';
                }, 2000);
            };

            frame.onerror = function() {
                clearTimeout(vncLoadTimeout);
                showError();
            };
        }

        function showError() {
            document.getElementById('loading').style.display = 'none';
            document.getElementById('error').classList.add('visible');
        }

        function toggleFullscreen() {
            const frame = document.getElementById('vnc-frame');
            if (document.fullscreenElement) {
                document.exitFullscreen();
            } else if (frame.style.display !== 'none') {
                frame.requestFullscreen().catch(() => {});
            }
        }

        function reloadVNC() {
            clearTimeout(vncLoadTimeout);
            initializeVNC();
        }

        document.addEventListener('DOMContentLoaded', initializeVNC);
    </script>
</body>
</html>
"#;

/// Render the landing page for the configured service.
#[must_use]
pub fn render_page(settings: &GatewaySettings) -> String {
    PAGE_TEMPLATE
        .replace("{{service_name}}", &settings.service_name())
        .replace("{{service_description}}", &settings.service.description)
        .replace("{{primary_color}}", &settings.service.primary_color)
        .replace("{{bg_start}}", &settings.service.bg_gradient_start)
        .replace("{{bg_end}}", &settings.service.bg_gradient_end)
        .replace("{{novnc_port}}", &settings.server.novnc_port.to_string())
}
