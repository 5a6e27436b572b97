//! nginx configuration for the tar1090 front-end.
//!
//! Serves the tar1090 static bundle on port 8080 and, once a receiver is
//! known, proxies `/data/` to it so the page reads live aircraft.json.

use crate::types::DeviceDescriptor;

/// Port nginx listens on inside the add-on.
pub const LISTEN_PORT: u16 = 8080;

/// Render the full nginx.conf.
///
/// The proxy block targets `host:port` of any detected device, whatever its
/// transport.
pub fn render_nginx_config(html_dir: &str, device: Option<&DeviceDescriptor>) -> String {
    let proxy = device.map(proxy_block).unwrap_or_default();

    format!(
        r#"
daemon off;
error_log /var/log/nginx/error.log warn;
pid /run/nginx/nginx.pid;

events {{
    worker_connections 1024;
}}

http {{
    include /etc/nginx/mime.types;
    default_type application/octet-stream;

    access_log /var/log/nginx/access.log;

    sendfile on;
    keepalive_timeout 65;
    gzip on;

    server {{
        listen {LISTEN_PORT};
        server_name _;

        root {html_dir};
        index index.html;

        location / {{
            try_files $uri $uri/ /index.html;
            add_header Cache-Control "public, max-age=3600";
        }}

        location ~ \.(json|geojson)$ {{
            add_header Cache-Control "no-cache, no-store, must-revalidate";
            add_header Pragma "no-cache";
            add_header Expires 0;
        }}
{proxy}
        location /health {{
            access_log off;
            return 200 "OK";
            add_header Content-Type text/plain;
        }}
    }}
}}
"#
    )
}

fn proxy_block(device: &DeviceDescriptor) -> String {
    let target = device.location();
    format!(
        r#"
        location /data/ {{
            proxy_pass http://{target}/data/;
            proxy_http_version 1.1;
            proxy_set_header Upgrade $http_upgrade;
            proxy_set_header Connection "upgrade";
            proxy_set_header Host $host;
            proxy_cache_bypass $http_upgrade;
        }}
"#
    )
}
