//! Integration tests for the one-shot build commands.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::tempdir;

fn cargo_bin() -> Command {
    let mut cmd = Command::new(env!("CARGO"));
    cmd.args(["run", "-p", "themekit-cli", "--bin", "themekit", "--"]);
    cmd.env_remove("RUST_LOG");
    cmd
}

fn themekit(root: &Path, args: &[&str]) -> Output {
    cargo_bin()
        .arg("--cwd")
        .arg(root)
        .args(args)
        .output()
        .expect("Failed to run themekit")
}

fn theme(root: &Path) {
    let scss = root.join("src/scss");
    fs::create_dir_all(&scss).unwrap();
    fs::write(
        scss.join("_variables.scss"),
        "$brand: #336699;\n@mixin boxed { padding: 1rem; }\n",
    )
    .unwrap();
    fs::write(
        scss.join("styles.scss"),
        "@import 'variables';\n\
         body { color: $brand; }\n\
         .card { @include boxed; .title { font-weight: bold; } }\n",
    )
    .unwrap();
    fs::write(
        scss.join("editor-styles.scss"),
        "@import 'variables';\n\
         .editor { color: $brand; }\n\
         .editor-title { @include boxed; }\n\
         .editor-link { text-decoration: underline; }\n",
    )
    .unwrap();

    let js = root.join("src/js");
    fs::create_dir_all(&js).unwrap();
    fs::write(js.join("a-nav.js"), "var menuOpen = false;\n").unwrap();
    fs::write(
        js.join("b-toggle.js"),
        "function toggleMenu() { menuOpen = !menuOpen; return menuOpen; }\n",
    )
    .unwrap();
}

fn css_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .filter_map(Result::ok)
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|n| n.ends_with(".css"))
        .collect();
    names.sort();
    names
}

#[test]
fn test_styles_compiles_both_entries() {
    let dir = tempdir().unwrap();
    theme(dir.path());

    let output = themekit(dir.path(), &["styles"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let css_dir = dir.path().join("css");
    assert_eq!(css_files(&css_dir), vec!["editor-styles.css", "styles.css"]);

    for name in ["styles.css", "editor-styles.css"] {
        let css = fs::read_to_string(css_dir.join(name)).unwrap();
        assert_eq!(css.matches('{').count(), 3, "{name}: {css}");
        assert!(!css.contains('$'));
        assert!(!css.contains("@mixin"));
        assert!(!css.contains("@include"));
        assert!(css.contains(&format!("sourceMappingURL=maps/{name}.map")));
        assert!(css_dir.join("maps").join(format!("{name}.map")).exists());
    }
}

#[test]
fn test_styles_failure_exits_nonzero() {
    let dir = tempdir().unwrap();
    theme(dir.path());
    fs::write(dir.path().join("src/scss/styles.scss"), "body { color: ").unwrap();

    let output = themekit(dir.path(), &["styles"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(!dir.path().join("css/styles.css").exists());
    assert!(dir.path().join("css/editor-styles.css").exists());
}

#[test]
fn test_scripts_bundle_in_listing_order_and_leave_css_alone() {
    let dir = tempdir().unwrap();
    theme(dir.path());

    assert!(themekit(dir.path(), &["styles"]).status.success());
    let css_before = fs::read(dir.path().join("css/styles.css")).unwrap();

    let output = themekit(dir.path(), &["scripts"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let js = fs::read_to_string(dir.path().join("js/scripts.js")).unwrap();
    assert!(js.ends_with("//# sourceMappingURL=maps/scripts.js.map\n"));
    let first = js.find("menuOpen").unwrap();
    let toggle = js.find("toggleMenu").unwrap();
    assert!(first < toggle);

    let map: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(dir.path().join("js/maps/scripts.js.map")).unwrap(),
    )
    .unwrap();
    assert_eq!(map["version"], 3);

    assert_eq!(fs::read(dir.path().join("css/styles.css")).unwrap(), css_before);
}

#[test]
fn test_sprite_injects_into_template() {
    let dir = tempdir().unwrap();
    let icons = dir.path().join("src/images/svg-sprite");
    fs::create_dir_all(&icons).unwrap();
    fs::write(
        icons.join("search.svg"),
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 24 24"><path d="M1 1h22"/></svg>"#,
    )
    .unwrap();
    fs::write(
        dir.path().join("src/images/logo.svg"),
        r#"<svg xmlns="http://www.w3.org/2000/svg"/>"#,
    )
    .unwrap();
    fs::write(
        dir.path().join("header.php"),
        "<body>\n<!-- inject:svg -->\n<?php wp_body_open(); ?>\n",
    )
    .unwrap();

    let output = themekit(dir.path(), &["sprite"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let header = fs::read_to_string(dir.path().join("header.php")).unwrap();
    assert!(header.contains(r#"<symbol id="search" viewBox="0 0 24 24">"#));
    assert!(!header.contains("<!-- inject:svg -->"));
    assert!(header.ends_with("<?php wp_body_open(); ?>\n"));
    assert!(dir.path().join("images/sprite.svg").exists());
    assert!(dir.path().join("images/logo.svg").exists());
}

#[test]
fn test_json_logs_carry_completion_notices() {
    let dir = tempdir().unwrap();
    theme(dir.path());

    let output = themekit(dir.path(), &["--json-logs", "styles"]);
    assert!(output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    let messages: Vec<String> = stderr
        .lines()
        .filter(|l| l.starts_with('{'))
        .map(|l| serde_json::from_str::<serde_json::Value>(l).expect("log line should be JSON"))
        .filter_map(|v| v["fields"]["message"].as_str().map(str::to_string))
        .collect();

    assert!(messages.iter().any(|m| m == "SASS Status: Theme Styles Compiled"));
    assert!(messages.iter().any(|m| m == "SASS Status: Editor Styles Compiled"));
}

#[test]
fn test_invalid_project_file_is_reported() {
    let dir = tempdir().unwrap();
    theme(dir.path());
    fs::write(dir.path().join("themekit.json"), r#"{"styles": {"browsers": 5}}"#).unwrap();

    let output = themekit(dir.path(), &["styles"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("themekit.json"));
}

#[test]
fn test_version() {
    let output = cargo_bin().arg("version").output().unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).starts_with("themekit "));
}

#[test]
fn test_missing_project_root() {
    let dir = tempdir().unwrap();
    let output = themekit(&dir.path().join("nope"), &["styles"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Project root does not exist"));
}

#[test]
fn test_explicit_config_file_is_used() {
    let dir = tempdir().unwrap();
    fs::create_dir_all(dir.path().join("src/js")).unwrap();
    fs::write(dir.path().join("src/js/app.js"), "window.double = (n) => n * 2;\n").unwrap();
    fs::write(dir.path().join("themekit.json"), r#"{"scripts": {"target": "es5"}}"#).unwrap();
    fs::write(dir.path().join("modern.json"), r#"{"scripts": {"target": "es2022"}}"#).unwrap();

    let output = themekit(dir.path(), &["--config", "modern.json", "scripts"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let js = fs::read_to_string(dir.path().join("js/scripts.js")).unwrap();
    assert!(js.contains("=>"));

    let output = themekit(dir.path(), &["scripts"]);
    assert!(output.status.success());
    let js = fs::read_to_string(dir.path().join("js/scripts.js")).unwrap();
    assert!(!js.contains("=>"));
}

#[test]
fn test_missing_config_file_is_an_error() {
    let dir = tempdir().unwrap();
    theme(dir.path());

    let output = themekit(dir.path(), &["--config", "missing.json", "styles"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Config file not found"));
    assert!(stderr.contains("missing.json"));
    assert!(!dir.path().join("css/styles.css").exists());
}
