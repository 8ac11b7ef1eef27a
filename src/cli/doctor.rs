//! `ouf-gateway doctor` - probes configuration and upstream services.
//!
//! Each check prints pass/fail/skip with a hint on failure.

use std::net::SocketAddr;

use crate::config::Config;
use crate::error::ConfigError;
use crate::registry::{AssistantRegistry, HttpRegistry};

/// Run every check and print the results.
pub async fn run_doctor_command(
    config: Result<Config, ConfigError>,
    strict: bool,
) -> anyhow::Result<()> {
    println!("OUF Gateway Doctor");
    println!("==================\n");

    let mut passed = 0u32;
    let mut failed = 0u32;

    let config = match config {
        Ok(config) => {
            check(
                "Configuration",
                CheckResult::Pass(format!("registry at {}", config.registry.base_url)),
                &mut passed,
                &mut failed,
            );
            Some(config)
        }
        Err(e) => {
            check(
                "Configuration",
                CheckResult::Fail(e.to_string()),
                &mut passed,
                &mut failed,
            );
            None
        }
    };

    match &config {
        Some(config) => {
            let bind = match config.server.socket_addr() {
                Ok(addr) => check_bind_available(addr),
                Err(e) => CheckResult::Fail(e.to_string()),
            };
            check("Gateway bind address", bind, &mut passed, &mut failed);
            check(
                "Assistant registry",
                check_registry(config).await,
                &mut passed,
                &mut failed,
            );
            check(
                "AI service URL",
                check_ask_url(config),
                &mut passed,
                &mut failed,
            );
        }
        None => {
            for name in ["Gateway bind address", "Assistant registry", "AI service URL"] {
                check(
                    name,
                    CheckResult::Skip("configuration did not load".to_string()),
                    &mut passed,
                    &mut failed,
                );
            }
        }
    }

    println!();
    println!("  {passed} passed, {failed} failed");

    if failed > 0 && strict {
        anyhow::bail!("doctor strict mode failed with {failed} check(s)");
    }
    Ok(())
}

// ── Individual checks ───────────────────────────────────────

fn check(name: &str, result: CheckResult, passed: &mut u32, failed: &mut u32) {
    match result {
        CheckResult::Pass(detail) => {
            *passed += 1;
            println!("  [pass] {name}: {detail}");
        }
        CheckResult::Fail(detail) => {
            *failed += 1;
            println!("  [FAIL] {name}: {detail}");
        }
        CheckResult::Skip(reason) => {
            println!("  [skip] {name}: {reason}");
        }
    }
}

enum CheckResult {
    Pass(String),
    Fail(String),
    Skip(String),
}

fn check_bind_available(addr: SocketAddr) -> CheckResult {
    match std::net::TcpListener::bind(addr) {
        Ok(listener) => {
            drop(listener);
            CheckResult::Pass(format!("{addr} is available"))
        }
        Err(error) => CheckResult::Fail(format!(
            "{addr} is unavailable ({error}); free the port or change GATEWAY_PORT"
        )),
    }
}

async fn check_registry(config: &Config) -> CheckResult {
    let registry = HttpRegistry::new(&config.registry);
    match registry.list_assistants().await {
        Ok(assistants) => CheckResult::Pass(format!("{} assistant(s) listed", assistants.len())),
        Err(e) => CheckResult::Fail(format!("{e}; check REGISTRY_API_URL and REGISTRY_API_KEY")),
    }
}

fn check_ask_url(config: &Config) -> CheckResult {
    if config.chat.base_url == config.registry.base_url {
        return CheckResult::Skip("ASK_API_URL not set, using the registry URL".to_string());
    }
    CheckResult::Pass(config.chat.base_url.clone())
}

#[cfg(test)]
fn format_result(result: &CheckResult) -> String {
    match result {
        CheckResult::Pass(s) => format!("Pass({s})"),
        CheckResult::Fail(s) => format!("Fail({s})"),
        CheckResult::Skip(s) => format!("Skip({s})"),
    }
}
