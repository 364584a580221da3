use anyhow::Result;
use rand::Rng;
use rstest::rstest;
use std::path::PathBuf;
use std::process::Command;

fn rid() -> String {
    let mut rng = rand::rng();
    (0..10)
        .map(|_| rng.sample(rand::distr::Alphanumeric) as char)
        .collect()
}

fn sandboxctl() -> Command {
    Command::new(env!("CARGO_BIN_EXE_sandboxctl"))
}

#[rstest]
fn test_usage_without_arguments() -> Result<()> {
    let output = sandboxctl().output()?;
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("--sandbox_name"));
    assert!(stdout.contains("--process_name"));
    assert!(stdout.contains("--config_file"));
    Ok(())
}

#[rstest]
fn test_unknown_sandbox_name_is_rejected() -> Result<()> {
    let output = sandboxctl().args(["-s", "bogus"]).output()?;
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("bogus"));
    Ok(())
}

/* A role with no discoverable policy has no root path, so construction must
 * fail before the target program runs, whatever uid the suite runs under. */
#[rstest]
fn test_missing_policy_fails_before_exec() -> Result<()> {
    let output = sandboxctl()
        .args(["-s", "system", "-c", "/nonexistent/system-sandbox.json"])
        .env("SANDBOX_POLICY_DIRS", "/nonexistent-layer")
        .output()?;
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("sandbox 'system'"));
    Ok(())
}

#[rstest]
fn test_unparseable_policy_fails_before_exec() -> Result<()> {
    let config = PathBuf::from(format!("/tmp/sandboxctl-cli-{}.json", rid()));
    std::fs::write(&config, "{ this is not json")?;

    let output = sandboxctl()
        .args(["-s", "chipset", "-c"])
        .arg(&config)
        .output()?;
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("sandbox 'chipset'"));

    std::fs::remove_file(&config)?;
    Ok(())
}

/* A bare -p targets the system sandbox, matching the original tool. */
#[rstest]
fn test_process_only_defaults_to_system_role() -> Result<()> {
    let output = sandboxctl()
        .args(["-p", "true", "-c", "/nonexistent/system-sandbox.json"])
        .env("SANDBOX_POLICY_DIRS", "/nonexistent-layer")
        .output()?;
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("sandbox 'system'"));
    Ok(())
}
