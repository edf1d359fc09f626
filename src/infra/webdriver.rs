//! # WebDriver Session / WebDriver 会话
//!
//! A small W3C WebDriver client implementing [`BrowserDriver`]. It talks JSON
//! over HTTP to any compliant server (chromedriver, geckodriver, a Selenium
//! grid). Element lookups poll until the default timeout, so steps behave as
//! if elements were awaited.
//!
//! 一个实现 [`BrowserDriver`] 的小型 W3C WebDriver 客户端。通过 HTTP 与任何兼容的
//! 服务器交换 JSON。元素查找会轮询直到默认超时，因此步骤的行为如同等待元素出现。

use std::path::Path;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::{Client, Method};
use serde_json::{Value, json};
use tracing::debug;

use crate::core::action::{Assertion, ElementOp};
use crate::core::config::BrowserConfig;
use crate::core::driver::BrowserDriver;
use crate::core::error::DriverError;
use crate::core::locator::{Locator, LocatorStrategy};

/// W3C element reference key.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// One open WebDriver session.
pub struct WebDriverSession {
    client: Client,
    base_url: String,
    session_id: String,
    browser: String,
    default_timeout: Duration,
    page_closed: bool,
}

impl WebDriverSession {
    /// Creates a session on the server at `config.webdriver_url`.
    ///
    /// `default_timeout` bounds element lookups and the assertions that do
    /// not carry their own timeout.
    pub async fn start(config: &BrowserConfig, default_timeout: Duration) -> Result<Self, DriverError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| DriverError::Transport(e.to_string()))?;
        let base_url = config.webdriver_url.trim_end_matches('/').to_string();

        let body = json!({ "capabilities": { "alwaysMatch": capabilities(config) } });
        let value = send(&client, Method::POST, &format!("{base_url}/session"), Some(body)).await?;
        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| DriverError::Protocol {
                error: "invalid session response".to_string(),
                message: value.to_string(),
            })?
            .to_string();
        debug!(session = %session_id, browser = %config.browser, "webdriver session created");

        let session = Self {
            client,
            base_url,
            session_id,
            browser: config.browser.to_ascii_lowercase(),
            default_timeout,
            page_closed: false,
        };
        session
            .command(
                Method::POST,
                "timeouts",
                Some(json!({ "implicit": config.implicit_wait_ms })),
            )
            .await?;
        Ok(session)
    }

    /// Deletes the session, closing every window it owns.
    pub async fn quit(self) -> Result<(), DriverError> {
        let url = format!("{}/session/{}", self.base_url, self.session_id);
        send(&self.client, Method::DELETE, &url, None).await?;
        debug!(session = %self.session_id, "webdriver session deleted");
        Ok(())
    }

    async fn command(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value, DriverError> {
        let url = format!("{}/session/{}/{}", self.base_url, self.session_id, path);
        send(&self.client, method, &url, body).await
    }

    async fn find_once(&self, locator: &Locator) -> Result<String, DriverError> {
        let (using, value) = to_query(locator);
        let found = self
            .command(Method::POST, "element", Some(json!({ "using": using, "value": value })))
            .await
            .map_err(|e| match e {
                DriverError::NoSuchElement { .. } => DriverError::NoSuchElement {
                    locator: locator.to_string(),
                },
                other => other,
            })?;
        element_id(&found)
    }

    /// Polls for the element until the default timeout.
    async fn find(&self, locator: &Locator) -> Result<String, DriverError> {
        let deadline = Instant::now() + self.default_timeout;
        loop {
            match self.find_once(locator).await {
                Err(DriverError::NoSuchElement { .. }) if Instant::now() < deadline => {
                    tokio::time::sleep(POLL_INTERVAL).await;
                }
                other => return other,
            }
        }
    }

    async fn element_command(
        &self,
        element: &str,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, DriverError> {
        self.command(method, &format!("element/{element}/{path}"), body)
            .await
    }

    async fn click(&self, element: &str) -> Result<(), DriverError> {
        self.element_command(element, Method::POST, "click", Some(json!({})))
            .await?;
        Ok(())
    }

    async fn send_keys(&self, element: &str, text: &str) -> Result<(), DriverError> {
        self.element_command(element, Method::POST, "value", Some(json!({ "text": text })))
            .await?;
        Ok(())
    }

    async fn flag(&self, element: &str, path: &str) -> Result<bool, DriverError> {
        let value = self.element_command(element, Method::GET, path, None).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn pointer(&self, element: &str, gesture: &[Value]) -> Result<(), DriverError> {
        let mut origin = serde_json::Map::new();
        origin.insert(ELEMENT_KEY.to_string(), Value::from(element));
        let mut actions = vec![json!({
            "type": "pointerMove",
            "duration": 0,
            "origin": origin,
            "x": 0,
            "y": 0,
        })];
        actions.extend_from_slice(gesture);
        let body = json!({
            "actions": [{
                "type": "pointer",
                "id": "mouse",
                "parameters": { "pointerType": "mouse" },
                "actions": actions,
            }]
        });
        self.command(Method::POST, "actions", Some(body)).await?;
        self.command(Method::DELETE, "actions", None).await?;
        Ok(())
    }

    async fn set_selected(&self, element: &str, selected: bool) -> Result<(), DriverError> {
        if self.flag(element, "selected").await? != selected {
            self.click(element).await?;
        }
        Ok(())
    }

    async fn select_by_label(&self, element: &str, label: &str) -> Result<(), DriverError> {
        let xpath = format!(".//option[normalize-space(.)={}]", xpath_literal(label.trim()));
        let option = self
            .element_command(
                element,
                Method::POST,
                "element",
                Some(json!({ "using": "xpath", "value": xpath })),
            )
            .await?;
        self.click(&element_id(&option)?).await
    }

    async fn is_empty(&self, element: &str) -> Result<bool, DriverError> {
        let value = self
            .element_command(element, Method::GET, "property/value", None)
            .await?;
        let text = self.element_command(element, Method::GET, "text", None).await?;
        let value_empty = value.as_str().is_none_or(str::is_empty);
        let text_empty = text.as_str().is_none_or(|t| t.trim().is_empty());
        Ok(value_empty && text_empty)
    }

    /// Evaluates `assertion` once. A missing element satisfies only `Hidden`.
    async fn holds(&self, locator: &Locator, assertion: Assertion) -> Result<bool, DriverError> {
        let element = match self.find_once(locator).await {
            Ok(element) => element,
            Err(DriverError::NoSuchElement { .. }) => return Ok(assertion == Assertion::Hidden),
            Err(e) => return Err(e),
        };
        let state = match assertion {
            Assertion::Visible => self.flag(&element, "displayed").await,
            Assertion::Hidden => self.flag(&element, "displayed").await.map(|shown| !shown),
            Assertion::Enabled => self.flag(&element, "enabled").await,
            Assertion::Disabled => self.flag(&element, "enabled").await.map(|on| !on),
            Assertion::Empty => self.is_empty(&element).await,
        };
        match state {
            // The element was replaced between lookup and query.
            Err(DriverError::Protocol { error, .. }) if error == "stale element reference" => Ok(false),
            other => other,
        }
    }
}

#[async_trait]
impl BrowserDriver for WebDriverSession {
    async fn prepare(&mut self) -> Result<(), DriverError> {
        if !self.page_closed {
            return Ok(());
        }
        let created = self
            .command(Method::POST, "window/new", Some(json!({ "type": "tab" })))
            .await?;
        let handle = created
            .get("handle")
            .and_then(Value::as_str)
            .ok_or_else(|| DriverError::Protocol {
                error: "invalid new window response".to_string(),
                message: created.to_string(),
            })?
            .to_string();
        self.command(Method::POST, "window", Some(json!({ "handle": handle })))
            .await?;
        self.page_closed = false;
        debug!(handle = %handle, "opened a fresh page");
        Ok(())
    }

    async fn goto(&mut self, url: &str) -> Result<(), DriverError> {
        self.command(Method::POST, "url", Some(json!({ "url": url })))
            .await?;
        Ok(())
    }

    async fn close_page(&mut self) -> Result<(), DriverError> {
        self.command(Method::DELETE, "window", None).await?;
        self.page_closed = true;
        Ok(())
    }

    async fn screenshot(&mut self, full_page: bool) -> Result<Vec<u8>, DriverError> {
        if self.page_closed {
            return Err(DriverError::PageClosed);
        }
        // Only geckodriver exposes a full-page endpoint; others capture the viewport.
        let path = if full_page && self.browser == "firefox" {
            "moz/screenshot/full"
        } else {
            "screenshot"
        };
        let encoded = self.command(Method::GET, path, None).await?;
        let encoded = encoded.as_str().ok_or_else(|| DriverError::Protocol {
            error: "invalid screenshot response".to_string(),
            message: encoded.to_string(),
        })?;
        STANDARD
            .decode(encoded)
            .map_err(|e| DriverError::Transport(format!("screenshot is not valid base64: {e}")))
    }

    async fn perform(&mut self, locator: &Locator, op: &ElementOp) -> Result<(), DriverError> {
        let element = self.find(locator).await?;
        match op {
            ElementOp::Fill(text) => {
                self.element_command(&element, Method::POST, "clear", Some(json!({})))
                    .await?;
                self.send_keys(&element, text).await
            }
            ElementOp::Clear => {
                self.element_command(&element, Method::POST, "clear", Some(json!({})))
                    .await?;
                Ok(())
            }
            ElementOp::Click => self.click(&element).await,
            ElementOp::DoubleClick => {
                let press = [
                    json!({ "type": "pointerDown", "button": 0 }),
                    json!({ "type": "pointerUp", "button": 0 }),
                ];
                self.pointer(&element, &[press.clone(), press].concat()).await
            }
            ElementOp::RightClick => {
                self.pointer(
                    &element,
                    &[
                        json!({ "type": "pointerDown", "button": 2 }),
                        json!({ "type": "pointerUp", "button": 2 }),
                    ],
                )
                .await
            }
            ElementOp::Hover => self.pointer(&element, &[]).await,
            ElementOp::SelectOption { label } => self.select_by_label(&element, label).await,
            ElementOp::PressKey(key) => self.send_keys(&element, &key_sequence(key)).await,
            ElementOp::Check | ElementOp::RadioSelect => self.set_selected(&element, true).await,
            ElementOp::Uncheck | ElementOp::RadioDeselect => {
                self.set_selected(&element, false).await
            }
            ElementOp::UploadFile(file) => {
                let absolute = std::fs::canonicalize(Path::new(file.trim()))
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|_| file.trim().to_string());
                self.send_keys(&element, &absolute).await
            }
        }
    }

    async fn check(
        &mut self,
        locator: &Locator,
        assertion: Assertion,
        timeout: Option<Duration>,
    ) -> Result<(), DriverError> {
        let timeout = timeout.unwrap_or(self.default_timeout);
        let deadline = Instant::now() + timeout;
        loop {
            if self.holds(locator, assertion).await? {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(DriverError::Timeout {
                    what: format!("{locator} to be {}", assertion_name(assertion)),
                    timeout_ms: timeout.as_millis() as u64,
                });
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}

async fn send(client: &Client, method: Method, url: &str, body: Option<Value>) -> Result<Value, DriverError> {
    debug!(%method, url, "webdriver request");
    let mut request = client.request(method, url);
    if let Some(body) = body {
        request = request.json(&body);
    }
    let response = request
        .send()
        .await
        .map_err(|e| DriverError::Transport(e.to_string()))?;
    let status = response.status();
    let payload: Value = response
        .json()
        .await
        .map_err(|e| DriverError::Transport(e.to_string()))?;
    let value = payload.get("value").cloned().unwrap_or(Value::Null);

    if status.is_success() {
        return Ok(value);
    }
    let error = value
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("unknown error")
        .to_string();
    let message = value
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    Err(classify(error, message))
}

fn classify(error: String, message: String) -> DriverError {
    match error.as_str() {
        "no such element" => DriverError::NoSuchElement { locator: message },
        "no such window" => DriverError::PageClosed,
        _ => DriverError::Protocol { error, message },
    }
}

fn element_id(value: &Value) -> Result<String, DriverError> {
    value
        .get(ELEMENT_KEY)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| DriverError::Protocol {
            error: "invalid element reference".to_string(),
            message: value.to_string(),
        })
}

fn capabilities(config: &BrowserConfig) -> Value {
    let mut caps = json!({ "browserName": config.browser });
    if config.headless {
        caps["goog:chromeOptions"] = json!({ "args": ["--headless=new", "--window-size=1280,1024"] });
        caps["ms:edgeOptions"] = json!({ "args": ["--headless=new"] });
        caps["moz:firefoxOptions"] = json!({ "args": ["-headless"] });
    }
    caps
}

fn assertion_name(assertion: Assertion) -> &'static str {
    match assertion {
        Assertion::Visible => "visible",
        Assertion::Hidden => "hidden",
        Assertion::Enabled => "enabled",
        Assertion::Disabled => "disabled",
        Assertion::Empty => "empty",
    }
}

/// Translates a locator into a W3C `(using, value)` query.
pub fn to_query(locator: &Locator) -> (&'static str, String) {
    let value = locator.value.as_str();
    let lit = xpath_literal(value);
    match locator.strategy {
        LocatorStrategy::Selector => {
            if let Some(xpath) = value.strip_prefix("xpath=") {
                ("xpath", xpath.to_string())
            } else if value.starts_with('/') || value.starts_with("(/") {
                ("xpath", value.to_string())
            } else {
                ("css selector", value.strip_prefix("css=").unwrap_or(value).to_string())
            }
        }
        LocatorStrategy::Role => ("xpath", role_xpath(value)),
        LocatorStrategy::Text => (
            "xpath",
            format!(
                "//*[contains(normalize-space(.), {lit}) and not(.//*[contains(normalize-space(.), {lit})])]"
            ),
        ),
        LocatorStrategy::TestId => ("xpath", format!("//*[@data-testid={lit}]")),
        LocatorStrategy::Label => (
            "xpath",
            format!(
                "//*[@id=//label[contains(normalize-space(.), {lit})]/@for] \
                 | //label[contains(normalize-space(.), {lit})]//*[self::input or self::textarea or self::select] \
                 | //*[@aria-label={lit}]"
            ),
        ),
        LocatorStrategy::Placeholder => ("xpath", format!("//*[@placeholder={lit}]")),
        LocatorStrategy::AltText => ("xpath", format!("//*[@alt={lit}]")),
        LocatorStrategy::Title => ("xpath", format!("//*[@title={lit}]")),
    }
}

/// Matches an explicit `role` attribute or the element's implicit role.
fn role_xpath(role: &str) -> String {
    let implicit = match role {
        "button" => Some(
            "self::button or (self::input and (@type='button' or @type='submit' or @type='reset'))",
        ),
        "link" => Some("self::a[@href]"),
        "textbox" => Some(
            "self::textarea or (self::input and (not(@type) or @type='text' or @type='email' \
             or @type='password' or @type='search' or @type='tel' or @type='url'))",
        ),
        "checkbox" => Some("self::input[@type='checkbox']"),
        "radio" => Some("self::input[@type='radio']"),
        "combobox" => Some("self::select"),
        "heading" => Some("self::h1 or self::h2 or self::h3 or self::h4 or self::h5 or self::h6"),
        "img" => Some("self::img"),
        "list" => Some("self::ul or self::ol"),
        "listitem" => Some("self::li"),
        _ => None,
    };
    let lit = xpath_literal(role);
    match implicit {
        Some(implicit) => format!("//*[@role={lit} or {implicit}]"),
        None => format!("//*[@role={lit}]"),
    }
}

/// Quotes `s` as an XPath 1.0 string literal.
pub fn xpath_literal(s: &str) -> String {
    if !s.contains('\'') {
        format!("'{s}'")
    } else if !s.contains('"') {
        format!("\"{s}\"")
    } else {
        let parts: Vec<String> = s.split('\'').map(|p| format!("'{p}'")).collect();
        format!("concat({})", parts.join(", \"'\", "))
    }
}

/// Maps a key name (`Enter`, `Tab`, `ArrowDown`, ...) to its WebDriver code
/// point. Anything else is typed literally.
pub fn key_sequence(key: &str) -> String {
    let code = match key.trim() {
        "Backspace" => '\u{E003}',
        "Tab" => '\u{E004}',
        "Enter" => '\u{E007}',
        "Shift" => '\u{E008}',
        "Control" => '\u{E009}',
        "Alt" => '\u{E00A}',
        "Escape" => '\u{E00C}',
        "Space" => '\u{E00D}',
        "PageUp" => '\u{E00E}',
        "PageDown" => '\u{E00F}',
        "End" => '\u{E010}',
        "Home" => '\u{E011}',
        "ArrowLeft" => '\u{E012}',
        "ArrowUp" => '\u{E013}',
        "ArrowRight" => '\u{E014}',
        "ArrowDown" => '\u{E015}',
        "Delete" => '\u{E017}',
        "Meta" => '\u{E03D}',
        _ => return key.to_string(),
    };
    code.to_string()
}
