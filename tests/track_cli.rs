mod support;

use support::TestHome;

fn slow_tick_config(home: &TestHome) -> String {
    let path = home
        .write_file("studytrack.toml", "[timer]\ntick_ms = 600000\n")
        .expect("write config");
    path.display().to_string()
}

#[test]
fn track_logs_manual_minutes_and_stops() {
    let home = TestHome::new();
    let id = home.add("Listening drill", "listening", "high");
    let config = slow_tick_config(&home);

    let output = home
        .cmd()
        .args(["--config", &config, "track", &id, "--json"])
        .write_stdin("p\n+10\ns\n")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let data: serde_json::Value = serde_json::from_slice(&output).expect("track json");
    assert_eq!(data["data"]["id"], id.as_str());
    assert_eq!(data["data"]["addedMinutes"], 10);
    assert_eq!(data["data"]["studyTime"], 10);

    let task = home.json(&["show", &id]);
    assert_eq!(task["studyTime"], 10);
}

#[test]
fn track_without_id_binds_first_task() {
    let home = TestHome::new();
    let oldest = home.add("Low", "reading", "low");
    home.add("High", "reading", "high");
    let config = slow_tick_config(&home);

    let output = home
        .cmd()
        .args(["--config", &config, "track", "--json"])
        .write_stdin("")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let data: serde_json::Value = serde_json::from_slice(&output).expect("track json");
    assert_eq!(data["data"]["id"], oldest.as_str());
    assert_eq!(data["data"]["title"], "Low");
    assert_eq!(data["data"]["addedMinutes"], 0);
}

#[test]
fn track_with_no_tasks_is_a_user_error() {
    let home = TestHome::new();
    home.cmd().arg("track").write_stdin("").assert().code(2);
}
