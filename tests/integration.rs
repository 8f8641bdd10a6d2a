use std::{fs, path::PathBuf, process::Command};

const PARAMS_TOML: &str = r#"
[model]
k_in = 0.8
k_out = 0.5
a_ext = 15.0
e_h = 2.0
beta = 0.3
g_max = 1.0
ic50 = 5.0
h = 2.0
r_p = 2.0
c_p = 0.1
gamma = 0.05
k_m = 0.5
delta_m = 0.4
k_q = 0.6
delta_q = 0.3

[simulation]
horizon = 10.0
grid_points = 100
runs = 10
resistance_threshold = 2.0
"#;

fn run_bin(args: &[&str]) {
    let bin = PathBuf::from(env!("CARGO_BIN_EXE_plasmidyn"));

    let output = Command::new(bin)
        .args(args)
        .output()
        .expect("failed to execute command");

    let stdout_str =
        std::str::from_utf8(&output.stdout).expect("failed to convert stdout to string");
    let stderr_str =
        std::str::from_utf8(&output.stderr).expect("failed to convert stderr to string");

    assert!(
        output.status.success(),
        "failed to run binary with {args:?}\nstdout:\n{stdout_str}\nstderr:\n{stderr_str}\n"
    );
}

#[test]
fn basic_workflow() {
    let test_dir = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join("basic_workflow");

    fs::remove_dir_all(&test_dir).ok();
    fs::create_dir(&test_dir).expect("failed to create test directory");

    let params_path = test_dir.join("params.toml");
    fs::write(&params_path, PARAMS_TOML).expect("failed to write params file");
    let params_str = params_path.to_str().expect("params path is not UTF-8");

    let ode_out = test_dir.join("ode.json");
    run_bin(&[
        "--params",
        params_str,
        "ode",
        "--out",
        ode_out.to_str().unwrap(),
    ]);

    let ssa_out = test_dir.join("ssa.json");
    let traj_out = test_dir.join("trajectories.msgpack");
    run_bin(&[
        "--params",
        params_str,
        "ssa",
        "--runs",
        "5",
        "--seed",
        "42",
        "--out",
        ssa_out.to_str().unwrap(),
        "--trajectories",
        traj_out.to_str().unwrap(),
    ]);

    let ode_json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&ode_out).expect("ode report missing"))
            .expect("ode report is not valid JSON");
    assert_eq!(ode_json["scenarios"].as_array().unwrap().len(), 3);

    let ssa_json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&ssa_out).expect("ssa report missing"))
            .expect("ssa report is not valid JSON");
    let reports = ssa_json.as_array().unwrap();
    assert_eq!(reports.len(), 3);
    for report in reports {
        assert_eq!(report["runs"].as_u64(), Some(5));
        let p_ext = report["extinction_probability"].as_f64().unwrap();
        let p_rescue = report["rescue_probability"].as_f64().unwrap();
        assert_eq!(p_ext + p_rescue, 1.0);
    }

    assert!(
        fs::metadata(&traj_out).expect("trajectory dump missing").len() > 0,
        "trajectory dump is empty"
    );

    fs::remove_dir_all(&test_dir).ok();
}

#[test]
fn zero_runs_override_is_rejected() {
    let test_dir = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join("zero_runs_override");

    fs::remove_dir_all(&test_dir).ok();
    fs::create_dir(&test_dir).expect("failed to create test directory");

    let params_path = test_dir.join("params.toml");
    fs::write(&params_path, PARAMS_TOML).expect("failed to write params file");

    let ssa_out = test_dir.join("ssa.json");
    let bin = PathBuf::from(env!("CARGO_BIN_EXE_plasmidyn"));
    let output = Command::new(bin)
        .args([
            "--params",
            params_path.to_str().unwrap(),
            "ssa",
            "--runs",
            "0",
            "--seed",
            "1",
            "--out",
            ssa_out.to_str().unwrap(),
        ])
        .output()
        .expect("failed to execute command");

    assert!(
        !output.status.success(),
        "a zero-run override must be rejected like a zero-run config"
    );
    assert!(!ssa_out.exists(), "no report must be written on rejection");

    fs::remove_dir_all(&test_dir).ok();
}

#[test]
fn invalid_params_fail_before_simulating() {
    let test_dir = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join("invalid_params");

    fs::remove_dir_all(&test_dir).ok();
    fs::create_dir(&test_dir).expect("failed to create test directory");

    let params_path = test_dir.join("params.toml");
    fs::write(&params_path, PARAMS_TOML.replace("ic50 = 5.0", "ic50 = -1.0"))
        .expect("failed to write params file");

    let bin = PathBuf::from(env!("CARGO_BIN_EXE_plasmidyn"));
    let output = Command::new(bin)
        .args(["--params", params_path.to_str().unwrap(), "ssa", "--runs", "1"])
        .output()
        .expect("failed to execute command");

    assert!(!output.status.success(), "invalid config must be rejected");

    fs::remove_dir_all(&test_dir).ok();
}
