use assert_cmd::cargo::cargo_bin_cmd;
use std::{error::Error, fs};

fn parse_lines(stdout: &[u8]) -> Result<Vec<f64>, Box<dyn Error>> {
    let text = String::from_utf8(stdout.to_vec())?;
    Ok(text
        .lines()
        .map(|l| l.trim().parse::<f64>())
        .collect::<Result<_, _>>()?)
}

#[test]
fn strategies_print_the_same_average() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("samples.txt");
    fs::write(&path, "3\n5\n7\n9\n")?;
    let input = path.to_str().expect("utf8 path");

    for strategy in ["cumulative", "direct", "convolution", "original", "convolve"] {
        let mut cmd = cargo_bin_cmd!("rpeak");
        cmd.args(["smooth", "--strategy", strategy, "--window", "2", "--input", input]);
        let output = cmd.assert().success().get_output().stdout.clone();
        let values = parse_lines(&output)?;
        let expected = [3.0, 4.0, 6.0, 8.0];
        assert_eq!(values.len(), expected.len());
        for (v, e) in values.iter().zip(expected) {
            assert!((v - e).abs() < 1e-9, "{strategy}: {values:?}");
        }
    }
    Ok(())
}

#[test]
fn bogus_strategy_is_rejected() {
    let mut cmd = cargo_bin_cmd!("rpeak");
    cmd.args(["smooth", "--strategy", "bogus", "--window", "3"])
        .write_stdin("1\n2\n3\n");
    let stderr = cmd.assert().failure().get_output().stderr.clone();
    let stderr = String::from_utf8_lossy(&stderr);
    assert!(stderr.contains("bogus"), "{stderr}");
}

#[test]
fn lists_every_detector() -> Result<(), Box<dyn Error>> {
    let mut cmd = cargo_bin_cmd!("rpeak");
    cmd.arg("detectors");
    let output = cmd.assert().success().get_output().stdout.clone();
    let text = String::from_utf8(output)?;
    let names: Vec<&str> = text
        .lines()
        .filter_map(|l| l.split('\t').next())
        .collect();
    assert_eq!(names, ["pan-tompkins", "swt", "engzee", "wqrs"]);
    Ok(())
}
