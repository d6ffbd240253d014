use std::path::PathBuf;
use std::time::Duration;

use serde_json::Value;
use thirtyfour::extensions::cdp::ChromeDevTools;
use thirtyfour::prelude::*;
use thirtyfour::ChromeCapabilities;

const TEST_PAGE: &str = "https://example.com/";
const TEST_FRAGMENT: &str = "example.com";
const TEST_SELECTOR: &str = "h1, .missing";

pub struct E2eOptions {
    pub chromedriver_url: String,
    pub extension_path: String,
    pub headless: bool,
}

pub fn run_e2e(opts: E2eOptions) -> Result<(), String> {
    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| format!("Failed to start tokio runtime: {}", e))?;
    runtime.block_on(run_e2e_async(opts))
}

async fn run_e2e_async(opts: E2eOptions) -> Result<(), String> {
    let extension_path = canonicalize_path(&opts.extension_path)?;

    let mut caps = ChromeCapabilities::new();
    let mut args = vec![
        format!("--disable-extensions-except={}", extension_path.display()),
        format!("--load-extension={}", extension_path.display()),
        "--no-first-run".to_string(),
        "--no-default-browser-check".to_string(),
        "--disable-default-apps".to_string(),
    ];
    if opts.headless {
        args.push("--headless=new".to_string());
        args.push("--disable-gpu".to_string());
    }
    for arg in &args {
        caps.add_arg(arg)
            .map_err(|e| format!("Failed to set chrome arg: {}", e))?;
    }

    let driver = WebDriver::new(&opts.chromedriver_url, caps)
        .await
        .map_err(|e| format!("Failed to connect to chromedriver: {}", e))?;

    let cdp = ChromeDevTools::new(driver.handle.clone());
    tokio::time::sleep(Duration::from_secs(1)).await;

    let extension_id = match find_extension_id(&cdp).await {
        Some(id) => id,
        None => {
            driver.quit().await.ok();
            return Err("Failed to locate extension service worker".to_string());
        }
    };
    let popup_url = format!("chrome-extension://{}/popup/popup.html", extension_id);

    let mut errors = Vec::new();

    for selector in ["#rules-list", "#url", "#selector", "#add-rule", "#dark-toggle"] {
        if let Err(e) = check_page_has_selector(&driver, &popup_url, selector).await {
            errors.push(format!("Popup check for {} failed: {}", selector, e));
        }
    }

    if let Err(e) = check_empty_add_rejected(&driver, &popup_url).await {
        errors.push(format!("Empty rule check failed: {}", e));
    }

    if let Err(e) = check_rule_removes_elements(&driver, &popup_url).await {
        errors.push(format!("Removal check failed: {}", e));
    }

    driver.quit().await.ok();

    if errors.is_empty() {
        println!("E2E checks passed");
        Ok(())
    } else {
        Err(format!("E2E failed:\n- {}", errors.join("\n- ")))
    }
}

async fn find_extension_id(cdp: &ChromeDevTools) -> Option<String> {
    let targets = cdp.execute_cdp("Target.getTargets").await.ok()?;
    let infos = targets.get("targetInfos")?.as_array()?;
    for info in infos {
        let target_type = info.get("type").and_then(Value::as_str).unwrap_or("");
        let url = info.get("url").and_then(Value::as_str).unwrap_or("");
        if target_type == "service_worker" && url.starts_with("chrome-extension://") {
            let id = url.trim_start_matches("chrome-extension://");
            if let Some(id) = id.split('/').next().filter(|id| !id.is_empty()) {
                return Some(id.to_string());
            }
        }
    }
    None
}

async fn check_page_has_selector(driver: &WebDriver, url: &str, selector: &str) -> WebDriverResult<()> {
    driver.goto(url).await?;
    driver.find(By::Css(selector)).await?;
    Ok(())
}

async fn rule_count(driver: &WebDriver) -> Result<usize, String> {
    driver
        .find_all(By::Css("#rules-list .rule-item"))
        .await
        .map(|items| items.len())
        .map_err(|e| format!("Failed to list rules: {}", e))
}

async fn check_empty_add_rejected(driver: &WebDriver, popup_url: &str) -> Result<(), String> {
    driver.goto(popup_url).await.map_err(|e| format!("Failed to open popup: {}", e))?;
    tokio::time::sleep(Duration::from_millis(300)).await;
    let before = rule_count(driver).await?;

    // Swallow the validation alert
    driver
        .execute("window.alert = () => {};", Vec::<Value>::new())
        .await
        .map_err(|e| format!("Failed to stub alert: {}", e))?;
    click(driver, "#add-rule").await?;
    tokio::time::sleep(Duration::from_millis(300)).await;

    if rule_count(driver).await? != before {
        return Err("Rule with empty fields was stored".to_string());
    }
    Ok(())
}

async fn check_rule_removes_elements(driver: &WebDriver, popup_url: &str) -> Result<(), String> {
    driver.goto(popup_url).await.map_err(|e| format!("Failed to open popup: {}", e))?;
    type_into(driver, "#url", TEST_FRAGMENT).await?;
    type_into(driver, "#selector", TEST_SELECTOR).await?;
    click(driver, "#add-rule").await?;
    tokio::time::sleep(Duration::from_millis(500)).await;

    driver
        .goto(TEST_PAGE)
        .await
        .map_err(|e| format!("Failed to navigate to {}: {}", TEST_PAGE, e))?;
    tokio::time::sleep(Duration::from_secs(2)).await;

    let remaining = eval_number(driver, "return document.querySelectorAll('h1').length;")
        .await
        .map_err(|e| format!("Failed to count headings: {}", e))?;
    if remaining != 0 {
        return Err(format!("Expected h1 to be removed, found {}", remaining));
    }

    // Content inserted after load is caught by the observer
    driver
        .execute("document.body.appendChild(document.createElement('h1'));", Vec::<Value>::new())
        .await
        .map_err(|e| format!("Failed to insert heading: {}", e))?;
    tokio::time::sleep(Duration::from_millis(500)).await;
    let reinserted = eval_number(driver, "return document.querySelectorAll('h1').length;")
        .await
        .map_err(|e| format!("Failed to count headings: {}", e))?;
    if reinserted != 0 {
        return Err("Inserted h1 survived the mutation observer".to_string());
    }
    Ok(())
}

async fn type_into(driver: &WebDriver, selector: &str, text: &str) -> Result<(), String> {
    let input = driver
        .find(By::Css(selector))
        .await
        .map_err(|e| format!("Missing {}: {}", selector, e))?;
    input.clear().await.map_err(|e| format!("Failed to clear {}: {}", selector, e))?;
    input
        .send_keys(text)
        .await
        .map_err(|e| format!("Failed to type into {}: {}", selector, e))
}

async fn click(driver: &WebDriver, selector: &str) -> Result<(), String> {
    driver
        .find(By::Css(selector))
        .await
        .map_err(|e| format!("Missing {}: {}", selector, e))?
        .click()
        .await
        .map_err(|e| format!("Failed to click {}: {}", selector, e))
}

async fn eval_number(driver: &WebDriver, script: &str) -> WebDriverResult<i64> {
    let result = driver.execute(script, Vec::<Value>::new()).await?;
    Ok(result.json().as_i64().unwrap_or(-1))
}

fn canonicalize_path(path: &str) -> Result<PathBuf, String> {
    std::fs::canonicalize(path)
        .map_err(|e| format!("Failed to resolve '{}': {}", path, e))
}
