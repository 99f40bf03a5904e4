use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant, SystemTime};
use tempfile::TempDir;

const NOW: &str = "2024-06-15T12:00:00Z";

struct CliTestEnv {
    _temp_dir: TempDir,
    home: PathBuf,
    xdg_config: PathBuf,
    xdg_state: PathBuf,
    work: PathBuf,
}

impl CliTestEnv {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let base = temp_dir.path().to_path_buf();
        let home = base.join("home");
        let xdg_config = base.join("xdg-config");
        let xdg_state = base.join("xdg-state");
        let work = base.join("work");

        fs::create_dir_all(&home).expect("failed to create HOME");
        fs::create_dir_all(&xdg_config).expect("failed to create XDG_CONFIG_HOME");
        fs::create_dir_all(&xdg_state).expect("failed to create XDG_STATE_HOME");
        fs::create_dir_all(&work).expect("failed to create work dir");

        Self {
            _temp_dir: temp_dir,
            home,
            xdg_config,
            xdg_state,
            work,
        }
    }

    fn write_page(&self, name: &str, body: &str) -> PathBuf {
        let path = self.work.join(name);
        fs::write(&path, body).expect("failed to write page");
        path
    }

    fn write_config(&self, toml: &str) {
        let dir = self.xdg_config.join("localtime");
        fs::create_dir_all(&dir).expect("failed to create config dir");
        fs::write(dir.join("config.toml"), toml).expect("failed to write config");
    }
}

fn bin_command(env: &CliTestEnv, args: &[&str]) -> Command {
    let bin_path = PathBuf::from(assert_cmd::cargo::cargo_bin!("localtime"));

    let mut command = Command::new(bin_path);
    command
        .args(args)
        .current_dir(&env.work)
        .env("HOME", &env.home)
        .env("XDG_CONFIG_HOME", &env.xdg_config)
        .env("XDG_STATE_HOME", &env.xdg_state)
        .env("LANG", "en_US.UTF-8")
        .env_remove("LC_ALL")
        .env_remove("LC_TIME");
    command
}

fn run_bin(env: &CliTestEnv, args: &[&str]) -> Output {
    bin_command(env, args)
        .output()
        .unwrap_or_else(|e| panic!("failed to execute localtime: {e}"))
}

fn spawn_bin(env: &CliTestEnv, args: &[&str]) -> Child {
    bin_command(env, args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap_or_else(|e| panic!("failed to spawn localtime: {e}"))
}

/// Kill a long-running child and collect what it printed.
fn stop(mut child: Child) -> Output {
    let _ = child.kill();
    child.wait_with_output().expect("failed to collect child output")
}

/// Poll until `path` contains `needle`, or give up after a few seconds.
fn wait_for_content(path: &Path, needle: &str) -> bool {
    let deadline = Instant::now() + Duration::from_secs(10);
    while Instant::now() < deadline {
        if fs::read_to_string(path).is_ok_and(|content| content.contains(needle)) {
            return true;
        }
        thread::sleep(Duration::from_millis(25));
    }
    false
}

/// Replace a page in one step, with a modification time the watcher cannot miss.
fn swap_page(path: &Path, body: &str) {
    let staged = path.with_extension("swap");
    fs::write(&staged, body).expect("failed to stage page");
    fs::File::options()
        .write(true)
        .open(&staged)
        .and_then(|file| file.set_modified(SystemTime::now() + Duration::from_secs(10)))
        .expect("failed to bump mtime");
    fs::rename(&staged, path).expect("failed to swap page");
}

fn time_tag(datetime: &str, mode: &str, text: &str) -> String {
    format!(r#"<time datetime="{datetime}" data-local-time="{mode}">{text}</time>"#)
}

fn path_arg(path: &Path) -> String {
    OsString::from(path).to_string_lossy().into_owned()
}

fn assert_success(args: &[&str], output: &Output) {
    if output.status.success() {
        return;
    }

    let rendered_args = args.join(" ");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    panic!(
        "localtime {rendered_args} failed\nstatus: {}\nstdout:\n{}\nstderr:\n{}",
        output.status, stdout, stderr
    );
}

#[test]
fn format_prints_relative_and_absolute() {
    let env = CliTestEnv::new();

    let args = ["format", "2024-06-15T10:59:59Z", "--now", NOW];
    let output = run_bin(&env, &args);
    assert_success(&args, &output);
    assert_eq!(String::from_utf8_lossy(&output.stdout), "1 hour ago\n");

    let args = [
        "format",
        "2024-01-01T00:00:00Z",
        "--mode",
        "absolute-date",
        "--locale",
        "en-US",
    ];
    let output = run_bin(&env, &args);
    assert_success(&args, &output);
    assert_eq!(String::from_utf8_lossy(&output.stdout), "January 1, 2024\n");
}

#[test]
fn format_rejects_bad_input() {
    let env = CliTestEnv::new();

    let output = run_bin(&env, &["format", "not-a-date"]);
    assert!(!output.status.success());

    let output = run_bin(&env, &["format", NOW, "--mode", "weekday"]);
    assert!(!output.status.success());
}

#[test]
fn bind_writes_stdout_and_reports_to_stderr() {
    let env = CliTestEnv::new();
    let page = env.write_page(
        "page.html",
        &format!(
            "<p>{}</p>\n<p>{}</p>\n",
            time_tag("2024-06-15T12:00:45Z", "relative", "raw"),
            time_tag(NOW, "weekday", "kept"),
        ),
    );

    let page_arg = path_arg(&page);
    let args = ["bind", page_arg.as_str(), "--now", NOW];
    let output = run_bin(&env, &args);
    assert_success(&args, &output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(
        stdout,
        format!(
            "<p>{}</p>\n<p>{}</p>\n",
            time_tag("2024-06-15T12:00:45Z", "relative", "45 seconds from now"),
            time_tag(NOW, "weekday", "kept"),
        )
    );

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("2 matched, 1 updated, 1 diagnostic(s)"),
        "unexpected report:\n{stderr}"
    );
    assert!(stderr.contains("unrecognized data-local-time value \"weekday\""));
}

#[test]
fn bind_in_place_over_glob_with_config_locale() {
    let env = CliTestEnv::new();
    env.write_config("[display]\nlocale = \"de-DE\"\n");
    let a = env.write_page("a.html", &time_tag("2024-01-01T00:00:00Z", "absolute-date", "raw"));
    let b = env.write_page("b.html", &time_tag("2024-03-09T00:00:00Z", "date", "raw"));

    let args = ["bind", "*.html", "--in-place", "--report", "json", "--now", NOW];
    let output = run_bin(&env, &args);
    assert_success(&args, &output);

    assert_eq!(
        fs::read_to_string(&a).unwrap(),
        time_tag("2024-01-01T00:00:00Z", "absolute-date", "1. Januar 2024")
    );
    assert_eq!(
        fs::read_to_string(&b).unwrap(),
        time_tag("2024-03-09T00:00:00Z", "date", "9. März 2024")
    );

    let reports: serde_json::Value =
        serde_json::from_slice(&output.stderr).expect("stderr should be a JSON report");
    let reports = reports.as_array().expect("report should be an array");
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0]["report"]["updated"], 1);
    assert!(reports[0]["report"]["diagnostics"]
        .as_array()
        .unwrap()
        .is_empty());
}

#[test]
fn bind_locale_flag_overrides_config() {
    let env = CliTestEnv::new();
    env.write_config("[display]\nlocale = \"de-DE\"\n");
    let page = env.write_page("page.html", &time_tag("2024-01-01T00:00:00Z", "absolute-date", "raw"));
    let out = env.work.join("out.html");

    let page_arg = path_arg(&page);
    let out_arg = path_arg(&out);
    let args = [
        "bind",
        page_arg.as_str(),
        "-o",
        out_arg.as_str(),
        "--locale",
        "en_GB",
    ];
    let output = run_bin(&env, &args);
    assert_success(&args, &output);

    assert!(output.stdout.is_empty());
    assert_eq!(
        fs::read_to_string(&out).unwrap(),
        time_tag("2024-01-01T00:00:00Z", "absolute-date", "1 January 2024")
    );
    // The input is left alone
    assert_eq!(
        fs::read_to_string(&page).unwrap(),
        time_tag("2024-01-01T00:00:00Z", "absolute-date", "raw")
    );
}

#[test]
fn bind_multiple_inputs_require_in_place() {
    let env = CliTestEnv::new();
    env.write_page("a.html", "<p></p>");
    env.write_page("b.html", "<p></p>");

    let output = run_bin(&env, &["bind", "*.html"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("--in-place"));
}

#[test]
fn bind_fails_when_nothing_matches() {
    let env = CliTestEnv::new();

    let output = run_bin(&env, &["bind", "missing-*.html"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("No input files matched"));
}

#[test]
fn bind_writes_log_file() {
    let env = CliTestEnv::new();
    let page = env.write_page("page.html", &time_tag(NOW, "relative", "raw"));

    let page_arg = path_arg(&page);
    let args = ["bind", page_arg.as_str(), "--now", NOW];
    let output = run_bin(&env, &args);
    assert_success(&args, &output);

    let log_dir = env.xdg_state.join("localtime");
    let has_log = fs::read_dir(&log_dir)
        .expect("log dir should exist")
        .flatten()
        .any(|entry| entry.file_name().to_string_lossy().starts_with("localtime.log"));
    assert!(has_log, "expected a log file in {}", log_dir.display());
}

#[test]
fn watch_rebinds_after_swap() {
    let env = CliTestEnv::new();
    let page = env.write_page("page.html", &time_tag("2024-06-15T11:00:00Z", "relative", "raw"));
    let out = env.work.join("out.html");

    let page_arg = path_arg(&page);
    let out_arg = path_arg(&out);
    let child = spawn_bin(
        &env,
        &["watch", page_arg.as_str(), "-o", out_arg.as_str(), "--poll", "20", "--now", NOW],
    );

    let initial = wait_for_content(&out, "1 hour ago");
    if initial {
        swap_page(&page, &time_tag("2024-06-13T12:00:00Z", "relative", "raw"));
    }
    let rebound = initial && wait_for_content(&out, "2 days ago");
    let output = stop(child);

    assert!(
        rebound,
        "watch did not rebind\nstdout:\n{}\nstderr:\n{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(String::from_utf8_lossy(&output.stdout).contains("Rebound: 1 updated"));
}

#[test]
fn watch_in_place_does_not_rebind_its_own_writes() {
    let env = CliTestEnv::new();
    let page = env.write_page("page.html", &time_tag("2024-06-15T11:00:00Z", "relative", "raw"));

    let page_arg = path_arg(&page);
    let child = spawn_bin(
        &env,
        &["watch", page_arg.as_str(), "-o", page_arg.as_str(), "--poll", "20", "--now", NOW],
    );

    let initial = wait_for_content(&page, "1 hour ago");
    if initial {
        // Let the initial pass finish with the file before swapping it
        thread::sleep(Duration::from_millis(200));
        swap_page(&page, &time_tag("2024-06-15T11:59:00Z", "relative", "raw"));
    }
    let rebound = initial && wait_for_content(&page, "1 minute ago");
    // Many poll intervals; a self-triggering loop would rebind on each
    thread::sleep(Duration::from_millis(500));
    let output = stop(child);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(rebound, "watch did not rebind\nstdout:\n{stdout}");
    assert_eq!(stdout.matches("Rebound:").count(), 1, "stdout:\n{stdout}");
}
