use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{exit, Command, ExitStatus};

use clap::{Parser, Subcommand, ValueEnum};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

const ADAPTER_PACKAGE: &str = "boxxy_lambda";
const ADAPTER_BINARY: &str = "boxxy_adapter";
const DIST_DIR: &str = "dist";
const TESTED_PACKAGES: [&str; 4] = [ADAPTER_PACKAGE, "boxxy_lambda_core", "lambdash", "xtask"];
const PACKAGE_NAME: &str = "boxxy_lambda.zip";

// ── CLI definition ─────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "xtask",
    about = "Task runner for the boxxy lambda workspace",
    long_about = "Packages the boxxy lambda deployment zip and runs CI checks\n\
                  for the adapter, its wire contract and the lambdash client."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the adapter once outside Lambda with the `id` smoke event
    Smoke {
        /// Program the adapter should run instead of the bundled boxxy
        #[arg(long, env = "BOXXY_PROGRAM")]
        program: Option<PathBuf>,
    },
    /// Run CI checks (fmt, clippy, tests)
    Ci {
        /// Job to run
        #[arg(value_enum, default_value_t = CiJob::Check)]
        job: CiJob,
    },
    /// Build the adapter and package it with boxxy into a Lambda zip
    ServerlessPackage {
        /// Prebuilt boxxy binary to ship next to the adapter
        #[arg(long)]
        boxxy: PathBuf,
        /// Compilation target triple for the adapter binary
        #[arg(long, default_value = "x86_64-unknown-linux-gnu")]
        target: String,
        /// Build profile used for the adapter binary
        #[arg(value_enum, long, default_value_t = BuildProfile::Release)]
        profile: BuildProfile,
    },
}

#[derive(Clone, ValueEnum)]
enum CiJob {
    /// Formatting and clippy
    Lint,
    /// Workspace tests
    Test,
    /// Run lint + test
    Check,
}

#[derive(Clone, Copy, ValueEnum)]
enum BuildProfile {
    Debug,
    Release,
}

impl BuildProfile {
    fn dir_name(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Release => "release",
        }
    }

    fn as_cargo_flag(self) -> Option<&'static str> {
        match self {
            Self::Debug => None,
            Self::Release => Some("--release"),
        }
    }
}

// ── helpers ────────────────────────────────────────────────────────

fn step(label: &str) {
    eprintln!("\n=== {label} ===");
}

fn cargo(args: &[&str]) -> Command {
    eprintln!("+ cargo {}", args.join(" "));
    let mut command = Command::new("cargo");
    command.args(args);
    command
}

fn exit_on_failure(status: ExitStatus) {
    if !status.success() {
        exit(status.code().unwrap_or(1));
    }
}

fn run_cargo(args: &[&str]) {
    exit_on_failure(cargo(args).status().expect("failed to execute cargo"));
}

// ── serverless packaging ───────────────────────────────────────────

fn package_serverless_lambda(boxxy: &Path, target: &str, profile: BuildProfile) {
    if !boxxy.is_file() {
        panic!("expected boxxy binary at '{}'", boxxy.display());
    }
    ensure_rust_target_installed(target);

    step("Build adapter binary");
    let mut cargo_args = vec![
        "build",
        "-p",
        ADAPTER_PACKAGE,
        "--target",
        target,
        "--bin",
        ADAPTER_BINARY,
    ];
    if let Some(flag) = profile.as_cargo_flag() {
        cargo_args.push(flag);
    }
    run_cargo(&cargo_args);

    step("Package lambda zip artifact");
    let target_dir = Path::new("target").join(target).join(profile.dir_name());
    let dist_dir = Path::new(DIST_DIR);
    fs::create_dir_all(dist_dir).expect("failed to create lambda dist directory");

    let zip_path = dist_dir.join(PACKAGE_NAME);
    package_lambda_zip(
        &[
            ("bootstrap", target_dir.join(ADAPTER_BINARY).as_path()),
            ("boxxy", boxxy),
        ],
        &zip_path,
    );

    eprintln!("\nPackaged artifact:\n- {}", zip_path.display());
}

fn ensure_rust_target_installed(target: &str) {
    let output = Command::new("rustup")
        .args(["target", "list", "--installed"])
        .output();

    let output = match output {
        Ok(value) => value,
        Err(error) => {
            eprintln!(
                "warning: failed to run `rustup target list --installed` ({error}); continuing without target preflight"
            );
            return;
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        panic!(
            "failed to list installed rust targets; run `rustup target list --installed` manually. details: {}",
            stderr.trim()
        );
    }

    let installed = String::from_utf8_lossy(&output.stdout);
    if !installed.lines().any(|line| line.trim() == target) {
        panic!(
            "required rust target `{target}` is not installed. install it with `rustup target add {target}` and re-run `cargo run -p xtask -- serverless-package`"
        );
    }
}

/// Writes every `(entry name, source file)` pair as an executable entry.
fn package_lambda_zip(entries: &[(&str, &Path)], zip_path: &Path) {
    let file = fs::File::create(zip_path).expect("failed to create lambda zip");
    let mut zip = ZipWriter::new(file);
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o755);

    for (name, source) in entries {
        if !source.exists() {
            panic!("expected '{name}' source at '{}'", source.display());
        }
        let bytes = fs::read(source).expect("failed to read lambda zip entry");
        zip.start_file(*name, options)
            .expect("failed to start lambda zip entry");
        zip.write_all(&bytes)
            .expect("failed to write lambda zip entry");
    }

    zip.finish().expect("failed to finish lambda zip");
}

// ── CI jobs ────────────────────────────────────────────────────────

fn ci_lint() {
    step("Check formatting");
    run_cargo(&["fmt", "--all", "--", "--check"]);

    step("Clippy");
    run_cargo(&[
        "clippy",
        "--all-targets",
        "--all-features",
        "--",
        "-D",
        "warnings",
    ]);
}

fn ci_test() {
    for package in TESTED_PACKAGES {
        step(&format!("Test {package}"));
        run_cargo(&["test", "-p", package]);
    }
}

fn smoke(program: Option<PathBuf>) {
    step("Run adapter smoke event");
    let mut command = cargo(&["run", "-p", ADAPTER_PACKAGE, "--bin", ADAPTER_BINARY]);
    // The smoke run must not pick up a runtime API from the caller's shell.
    command.env_remove("AWS_LAMBDA_RUNTIME_API");
    if let Some(program) = program {
        command.env("BOXXY_PROGRAM", program);
    }
    exit_on_failure(command.status().expect("failed to execute cargo"));
}

// ── main ───────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Smoke { program } => smoke(program),
        Commands::Ci { job } => {
            match job {
                CiJob::Lint => ci_lint(),
                CiJob::Test => ci_test(),
                CiJob::Check => {
                    ci_lint();
                    ci_test();
                }
            }
            eprintln!("\nCI job passed.");
        }
        Commands::ServerlessPackage {
            boxxy,
            target,
            profile,
        } => {
            package_serverless_lambda(&boxxy, &target, profile);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use super::*;

    #[test]
    fn ci_tests_every_workspace_member() {
        let workspace_manifest = Path::new(env!("CARGO_MANIFEST_DIR")).join("../Cargo.toml");
        let manifest = fs::read_to_string(workspace_manifest).expect("read workspace manifest");
        let members: Vec<&str> = manifest
            .lines()
            .map(str::trim)
            .filter_map(|line| line.strip_prefix('"')?.strip_suffix("\","))
            .collect();

        assert_eq!(members.len(), TESTED_PACKAGES.len());
        for member in members {
            let package = member.rsplit('/').next().expect("member path");
            assert!(TESTED_PACKAGES.contains(&package), "{package} is not tested by ci");
        }
    }

    #[test]
    fn package_contains_executable_bootstrap_and_boxxy() {
        let dir = tempfile::tempdir().expect("tempdir");
        let bootstrap = dir.path().join("adapter");
        let boxxy = dir.path().join("boxxy-bin");
        fs::write(&bootstrap, b"adapter-bytes").expect("write adapter");
        fs::write(&boxxy, b"boxxy-bytes").expect("write boxxy");

        let zip_path = dir.path().join(PACKAGE_NAME);
        package_lambda_zip(
            &[("bootstrap", bootstrap.as_path()), ("boxxy", boxxy.as_path())],
            &zip_path,
        );

        let mut archive =
            zip::ZipArchive::new(fs::File::open(&zip_path).expect("open zip")).expect("read zip");
        assert_eq!(archive.len(), 2);

        for (name, expected) in [("bootstrap", &b"adapter-bytes"[..]), ("boxxy", b"boxxy-bytes")] {
            let mut entry = archive.by_name(name).expect("entry present");
            assert_eq!(entry.unix_mode().map(|mode| mode & 0o777), Some(0o755));
            let mut contents = Vec::new();
            entry.read_to_end(&mut contents).expect("read entry");
            assert_eq!(contents, expected);
        }
    }
}
