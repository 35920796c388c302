mod batch;
mod cli;
mod color;
mod data_loaders;
mod error;
mod locator;
mod logging;
mod orchestrator;
mod paths;
mod privileged;
mod registry;
mod rewriter;

use std::process::ExitCode;

use clap::Parser;

use crate::{
	cli::Args,
	data_loaders::config::ToolConfig,
	logging::{LogSettings, Logger},
	orchestrator::Orchestrator,
	privileged::SystemOps,
	registry::LocalMachine,
};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const DEBUG_NAME: &str = "CLI";

fn print_banner() {
	println!("win-wallpaper Version {VERSION} - GPLv3\nGitHub - https://github.com/valleyofdoom\n");
}

fn error_chain(err: &dyn std::error::Error) -> String {
	let mut message = err.to_string();
	let mut source = err.source();
	while let Some(cause) = source {
		let cause_text = cause.to_string();
		if !message.ends_with(&cause_text) {
			message.push_str(": ");
			message.push_str(&cause_text);
		}
		source = cause.source();
	}
	message
}

fn run(config: &ToolConfig, log: &Logger) -> u8 {
	let ops = SystemOps;
	let registry = LocalMachine;
	let orchestrator = Orchestrator::new(&ops, &registry, log);

	if let Err(e) = orchestrator.check_privileges() {
		error!(log, "{e}");
		return e.exit_code();
	}

	let args = match Args::try_parse() {
		Ok(args) => args,
		Err(e) => {
			let _ = e.print();
			return u8::try_from(e.exit_code()).unwrap_or(2);
		}
	};

	let run_config = args.into_run_config(config);
	debug!(log, "run configuration: {:?}", run_config);

	match orchestrator.run(&run_config) {
		Ok(summary) => {
			debug!(
				log,
				"rewrote {} of {} images with {} (legacy background: {}, registry: {:?})",
				summary.report.rewritten,
				summary.discovered,
				summary.color,
				summary.legacy_background,
				summary.scope
			);
			0
		}
		Err(e) if e.is_fatal() => {
			error!(log, "{}", error_chain(&e));
			e.exit_code()
		}
		Err(e) => {
			error!(log, "{e}");
			e.exit_code()
		}
	}
}

fn main() -> ExitCode {
	let config = ToolConfig::load_or_default(&paths::config_path());
	let log = Logger::new(
		DEBUG_NAME,
		&LogSettings {
			debug: config.debug,
			console: true,
			file: config.log_file.as_deref().map(paths::resolve_from_exe_dir),
		},
	);

	print_banner();

	let code = run(&config, &log);
	log.finish();
	ExitCode::from(code)
}
