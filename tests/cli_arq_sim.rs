use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!(
        "arq-sim-{prefix}-{}-{nanos}",
        std::process::id()
    ));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn summary_line(stdout: &str) -> Option<&str> {
    stdout.lines().find(|l| l.starts_with("done @ "))
}

fn summary_field<'a>(stdout: &'a str, key: &str) -> Option<&'a str> {
    summary_line(stdout)?
        .split(", ")
        .find_map(|kv| kv.strip_prefix(&format!("{key}=")))
}

#[test]
fn arq_sim_go_back_n_delivers_everything_and_writes_log() {
    let dir = unique_temp_dir("gbn");
    let out_json = dir.join("log.json");

    let output = Command::new(env!("CARGO_BIN_EXE_arq_sim"))
        .args([
            "--protocol",
            "5",
            "--seq-bits",
            "4",
            "--window",
            "4",
            "--loss",
            "0.2",
            "--seed",
            "17",
            "--payload-a",
            "go back n over a lossy link",
            "--payload-b",
            "reverse traffic",
            "--log-json",
            out_json.to_str().unwrap(),
        ])
        .output()
        .expect("run arq_sim");
    assert!(
        output.status.success(),
        "arq_sim failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(summary_field(&stdout, "protocol"), Some("5"));
    assert_eq!(summary_field(&stdout, "outcome"), Some("Reached"));
    // 27 字节 -> 2 个分组；15 字节 -> 1 个分组
    assert_eq!(summary_field(&stdout, "delivered_b"), Some("2"));
    assert_eq!(summary_field(&stdout, "delivered_a"), Some("1"));

    let raw = fs::read_to_string(&out_json).expect("read log json");
    let log: Vec<Value> = serde_json::from_str(&raw).expect("parse log json");
    assert!(!log.is_empty());
    assert_eq!(log[0]["kind"], "frame_sent");
    assert!(log.iter().all(|v| v["instance_id"] == 1));
    let texts: Vec<&str> = log
        .iter()
        .filter(|v| v["kind"] == "packet_delivered" && v["endpoint"] == "B")
        .filter_map(|v| v["text"].as_str())
        .collect();
    assert_eq!(texts.concat(), "go back n over a lossy link");
}

#[test]
fn arq_sim_reads_json_config_and_is_reproducible() {
    let dir = unique_temp_dir("config");
    let cfg = dir.join("cfg.json");
    fs::write(
        &cfg,
        r#"{ "protocol": "selective_repeat", "seq_bits": 4, "window_size": 3,
             "faults": { "loss": 0.2, "duplicate": 0.1 }, "seed": 9 }"#,
    )
    .expect("write config");

    let run = |name: &str| {
        let out = dir.join(name);
        let output = Command::new(env!("CARGO_BIN_EXE_arq_sim"))
            .args([
                "--config",
                cfg.to_str().unwrap(),
                "--log-json",
                out.to_str().unwrap(),
            ])
            .output()
            .expect("run arq_sim");
        assert!(output.status.success());
        (
            String::from_utf8_lossy(&output.stdout).into_owned(),
            fs::read_to_string(&out).expect("read log json"),
        )
    };

    let (stdout1, log1) = run("a.json");
    let (stdout2, log2) = run("b.json");
    assert_eq!(summary_field(&stdout1, "protocol"), Some("6"));
    assert_eq!(summary_field(&stdout1, "outcome"), Some("Reached"));
    assert_eq!(summary_line(&stdout1), summary_line(&stdout2));
    assert_eq!(log1, log2);
}

#[test]
fn arq_sim_rejects_window_for_non_window_protocol() {
    let output = Command::new(env!("CARGO_BIN_EXE_arq_sim"))
        .args(["--protocol", "3", "--window", "4"])
        .output()
        .expect("run arq_sim");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Unsupported"), "stderr: {stderr}");
}
