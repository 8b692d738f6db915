// SPDX-License-Identifier: Apache-2.0

use colored::Colorize;

/// Prints `message` (plus indented key/value details) to stderr and exits
/// with status 1.
pub fn report_cli_error_and_exit(
    message: &str,
    context: Option<&str>,
    details: Vec<(&str, &str)>,
) -> ! {
    let context_str = match context {
        Some(context) => format!("{}: ", context),
        None => String::new(),
    };
    eprintln!("bimple-tv-driver: {}{}", context_str, message.red().bold());
    for (key, value) in details {
        eprintln!("  {}: {}", key, value);
    }
    std::process::exit(1);
}
