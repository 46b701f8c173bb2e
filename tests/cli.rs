use assert_cmd::Command;
use serde_json::Value;

#[test]
fn tools_command_lists_names() {
    let output = Command::cargo_bin("bic")
        .unwrap()
        .args(["tools", "--names"])
        .env("RUST_LOG", "off")
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let names: Vec<&str> = stdout.lines().collect();
    assert_eq!(names.len(), 6);
    assert!(names.contains(&"browser_act"));
}

#[test]
fn tools_command_prints_schemas_as_json() {
    let output = Command::cargo_bin("bic")
        .unwrap()
        .arg("tools")
        .env("RUST_LOG", "off")
        .output()
        .unwrap();
    assert!(output.status.success());
    let descriptors: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(descriptors[0]["name"], "browser_session_open");
    assert!(descriptors[0]["inputSchema"].is_object());
}

#[test]
fn serve_answers_each_line_and_exits_on_eof() {
    let output = Command::cargo_bin("bic")
        .unwrap()
        .arg("serve")
        .env("RUST_LOG", "off")
        .write_stdin("{\"tool\":\"browser_observe\",\"arguments\":{\"sessionId\":\"nope\"}}\nnot json\n")
        .output()
        .unwrap();
    assert!(output.status.success());
    let lines: Vec<Value> = String::from_utf8(output.stdout)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["ok"], false);
    assert_eq!(lines[0]["error"]["code"], "SESSION_NOT_FOUND");
    assert_eq!(lines[1]["error"]["code"], "CONTRACT_MISMATCH");
}
