//! Offline Fallbacks
//!
//! Fixed responses served when a request misses every cache and the network
//! is unreachable.

use pantry_net::{Request, Response};

/// Self-contained offline page: inline styles, no external resources
pub const OFFLINE_PAGE: &str = r#"
                <!DOCTYPE html>
                <html dir="rtl" lang="he">
                <head>
                    <meta charset="UTF-8">
                    <meta name="viewport" content="width=device-width, initial-scale=1.0">
                    <title>אפליקציה לא זמינה</title>
                    <style>
                        body { 
                            font-family: Arial, sans-serif; 
                            text-align: center; 
                            padding: 50px; 
                            background: linear-gradient(135deg, #667eea 0%, #764ba2 100%);
                            color: white;
                        }
                        .container { background: rgba(255,255,255,0.1); padding: 40px; border-radius: 20px; }
                        h1 { font-size: 2em; margin-bottom: 20px; }
                        p { font-size: 1.2em; }
                    </style>
                </head>
                <body>
                    <div class="container">
                        <h1>🛒</h1>
                        <h1>אפליקציה לא זמינה</h1>
                        <p>אנא בדוק את החיבור לאינטרנט ונסה שוב</p>
                        <p>הרשימות השמורות יטענו כשהחיבור יחזור</p>
                    </div>
                </body>
                </html>
              "#;

/// Body of the plain-text fallback
pub const OFFLINE_TEXT: &str = "אין חיבור לאינטרנט";

pub fn offline_page() -> Response {
    Response::new(200, OFFLINE_PAGE).with_header("Content-Type", "text/html")
}

pub fn offline_text() -> Response {
    Response::new(503, OFFLINE_TEXT)
        .with_status_text("Service Unavailable")
        .with_header("Content-Type", "text/plain; charset=utf-8")
}

/// Pick the fallback for a request that could not be fetched
pub fn fallback_for(request: &Request) -> Response {
    if request.accepts_html() {
        offline_page()
    } else {
        offline_text()
    }
}
