use std::{env, env::VarError};

/// The server takes no arguments. Any argument prints the help text and the current configuration.
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
        display_readme();
        display_envs();
    }
    has_cli_args
}

fn display_readme() {
    const README: &str = include_str!("./cli-help.txt");
    println!("\n{README}\n");
}

fn display_envs() {
    const DISPLAY_ENVS: [&str; 12] = [
        "RUST_LOG",
        "GBP_HOST",
        "GBP_PORT",
        "GBP_PIPELINE_COMMAND",
        "GBP_PIPELINE_WORKDIR",
        "GBP_PIPELINE_TIMEOUT_SECS",
        "GBP_OUTPUT_TAIL_CHARS",
        "GBP_DATA_DIR",
        "GBP_REPORTS_DIR",
        "GBP_MATCH_TOLERANCE_MINS",
        "GBP_ANOMALY_WINDOW_DAYS",
        "GBP_ANOMALY_RATIO",
    ];

    println!("Current environment values:");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    })
}
