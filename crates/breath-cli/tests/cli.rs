use assert_cmd::cargo::cargo_bin_cmd;
use serde_json::Value;
use std::{error::Error, f64::consts::PI, fs, path::Path};
use tempfile::tempdir;

const FS: f64 = 50.0;

/// 60 s of 0.25 Hz breathing in `chest` and a flat `flat` channel.
fn write_recording(path: &Path, gap_at: Option<usize>) -> Result<(), Box<dyn Error>> {
    let mut text = String::from("time,chest,flat\n");
    for i in 0..(60.0 * FS) as usize {
        let t = i as f64 / FS;
        let chest = if Some(i) == gap_at {
            String::new()
        } else {
            (2.0 + (2.0 * PI * 0.25 * t).sin()).to_string()
        };
        text.push_str(&format!("{t},{chest},1\n"));
    }
    fs::write(path, text)?;
    Ok(())
}

#[test]
fn onsets_report_each_channel() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let input = dir.path().join("belt.csv");
    write_recording(&input, None)?;

    let output = cargo_bin_cmd!("breath")
        .args(["onsets", "--input", input.to_str().expect("utf8 path")])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let reports: Value = serde_json::from_slice(&output)?;
    let reports = reports.as_array().expect("array of channel reports");
    assert_eq!(reports.len(), 2);

    assert_eq!(reports[0]["channel"], "chest");
    let inspirations = reports[0]["ok"]["In"].as_array().expect("In column");
    let expirations = reports[0]["ok"]["Ex"].as_array().expect("Ex column");
    assert!((14..=16).contains(&inspirations.len()));
    assert_eq!(inspirations.len(), expirations.len());
    assert!(reports[0]["error"].is_null());

    assert_eq!(reports[1]["channel"], "flat");
    assert!(reports[1]["ok"].is_null());
    assert_eq!(reports[1]["error"]["kind"], "InsufficientData");
    Ok(())
}

#[test]
fn features_follow_scaling_flag() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let input = dir.path().join("belt.csv");
    write_recording(&input, None)?;

    let run = |scaling: &str| -> Result<Value, Box<dyn Error>> {
        let output = cargo_bin_cmd!("breath")
            .args([
                "features",
                "--input",
                input.to_str().expect("utf8 path"),
                "--channel",
                "chest",
                "--scaling",
                scaling,
            ])
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        Ok(serde_json::from_slice(&output)?)
    };
    let one = run("1")?;
    let two = run("2")?;
    let rows_one = one[0]["ok"]["rows"].as_array().expect("rows");
    let rows_two = two[0]["ok"]["rows"].as_array().expect("rows");
    assert_eq!(rows_one.len(), rows_two.len());

    let first = &rows_one[0];
    let period = first["Period_T"].as_f64().expect("period");
    let insp = first["Insp_T"].as_f64().expect("insp");
    let exp = first["Exp_T"].as_f64().expect("exp");
    assert!((period - insp - exp).abs() < 1e-9);
    let depth_one = first["Depth"].as_f64().expect("depth");
    let depth_two = rows_two[0]["Depth"].as_f64().expect("depth");
    assert!((2.0 * depth_one - depth_two).abs() < 1e-9);

    let last = rows_one.last().expect("last row");
    assert!(last["Period_T"].is_null());
    assert_eq!(last["status"], "last");
    Ok(())
}

#[test]
fn continuous_writes_csv_with_gaps() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let input = dir.path().join("belt.csv");
    let out = dir.path().join("continuous.csv");
    write_recording(&input, Some(100))?;

    cargo_bin_cmd!("breath")
        .args([
            "continuous",
            "--input",
            input.to_str().expect("utf8 path"),
            "--channel",
            "chest",
            "--out",
            out.to_str().expect("utf8 path"),
        ])
        .assert()
        .success();

    let text = fs::read_to_string(&out)?;
    let mut lines = text.lines();
    assert_eq!(
        lines.next(),
        Some("time,Raw,Filt,Depth,Insp_T,Period_T,Exp_T,IE_Ratio,Insp_V,Exp_V")
    );
    let rows: Vec<&str> = lines.collect();
    assert_eq!(rows.len(), 3000);
    // Gap sample: Raw and Filt empty; before the first onset all features are
    // undefined under the default `previous` interpolation.
    assert!(rows[100].starts_with("2,,,"));
    // Every feature is defined at the end of the record except the ones the
    // last breath leaves unset.
    let tail: Vec<&str> = rows[2999].split(',').collect();
    assert_eq!(tail.len(), 10);
    assert!(tail[1..5].iter().all(|cell| !cell.is_empty()));
    Ok(())
}

#[test]
fn normalize_reads_config_file() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let input = dir.path().join("belt.csv");
    let config = dir.path().join("analysis.toml");
    write_recording(&input, Some(10))?;
    fs::write(&config, "scaling = 1\n")?;

    let output = cargo_bin_cmd!("breath")
        .args([
            "normalize",
            "--input",
            input.to_str().expect("utf8 path"),
            "--channel",
            "chest",
            "--config",
            config.to_str().expect("utf8 path"),
        ])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8(output)?;
    let rows: Vec<&str> = text.lines().collect();
    assert_eq!(rows[0], "time,chest");
    assert_eq!(rows.len(), 3001);
    assert_eq!(rows[11], "0.2,");
    let peak = rows[1..]
        .iter()
        .filter_map(|row| row.split(',').nth(1))
        .filter(|cell| !cell.is_empty())
        .map(|cell| cell.parse::<f64>().map(f64::abs))
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .fold(0.0f64, f64::max);
    assert!(peak > 0.8 && peak < 1.2, "peak {peak}");
    Ok(())
}

#[test]
fn diff_reads_stdin() -> Result<(), Box<dyn Error>> {
    let output = cargo_bin_cmd!("breath")
        .arg("diff")
        .write_stdin("time,belt\n0,0\n0.1,1\n0.2,2\n0.3,3\n")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8(output)?;
    assert_eq!(text, "time,belt\n0,1\n0.1,1\n0.2,1\n0.3,1\n");
    Ok(())
}

#[test]
fn invalid_configuration_fails() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let input = dir.path().join("belt.csv");
    let config = dir.path().join("analysis.toml");
    write_recording(&input, None)?;
    fs::write(&config, "scaling = \"loud\"\n")?;

    cargo_bin_cmd!("breath")
        .args([
            "continuous",
            "--input",
            input.to_str().expect("utf8 path"),
            "--interp",
            "bezier",
        ])
        .assert()
        .failure();
    cargo_bin_cmd!("breath")
        .args([
            "features",
            "--input",
            input.to_str().expect("utf8 path"),
            "--config",
            config.to_str().expect("utf8 path"),
        ])
        .assert()
        .failure();
    Ok(())
}

#[test]
fn analysis_flags_are_shared_across_subcommands() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let input = dir.path().join("belt.csv");
    let config = dir.path().join("analysis.toml");
    write_recording(&input, None)?;
    fs::write(&config, "scaling = 1\n")?;

    let output = cargo_bin_cmd!("breath")
        .args([
            "normalize",
            "--input",
            input.to_str().expect("utf8 path"),
            "--channel",
            "chest",
            "--config",
            config.to_str().expect("utf8 path"),
            "--scaling",
            "2",
        ])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8(output)?;
    let peak = text
        .lines()
        .skip(1)
        .filter_map(|row| row.split(',').nth(1))
        .filter(|cell| !cell.is_empty())
        .map(|cell| cell.parse::<f64>().map(f64::abs))
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .fold(0.0f64, f64::max);
    assert!(peak > 1.6 && peak < 2.4, "peak {peak}");

    let output = cargo_bin_cmd!("breath")
        .args([
            "onsets",
            "--input",
            input.to_str().expect("utf8 path"),
            "--channel",
            "chest",
            "--config",
            config.to_str().expect("utf8 path"),
            "--scaling",
            "auto",
        ])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let reports: Value = serde_json::from_slice(&output)?;
    let inspirations = reports[0]["ok"]["In"].as_array().expect("In column");
    assert!((14..=16).contains(&inspirations.len()));
    Ok(())
}
