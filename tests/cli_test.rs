use assert_cmd::Command;
use predicates::prelude::*;
type STDRESULT = Result<(),Box<dyn std::error::Error>>;

#[test]
fn mkdsk_then_analyse_clean() -> STDRESULT {
    let dir = tempfile::tempdir()?;
    let dimg = dir.path().join("test.dsk");
    let mut cmd = Command::cargo_bin("flexkit")?;
    cmd.arg("mkdsk")
        .arg("-d").arg(&dimg)
        .arg("-l").arg("TEST")
        .arg("-v").arg("42")
        .assert()
        .success()
        .stdout(predicate::str::contains("Writing Flex image file"));
    let mut cmd = Command::cargo_bin("flexkit")?;
    cmd.arg("analyse").arg(&dimg)
        .assert()
        .success()
        .stdout(predicate::str::contains("Flex Volume name: TEST, 40 tracks, 10 sectors/track"))
        .stdout(predicate::str::contains("Free sectors: 390"));
    Ok(())
}

#[test]
fn analyse_refuses_foreign_image() -> STDRESULT {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("other.dsk");
    std::fs::write(&path,vec![0u8;102400])?;
    let mut cmd = Command::cargo_bin("flexkit")?;
    cmd.arg("analyse").arg(&path)
        .assert()
        .code(3)
        .stderr(predicate::str::contains("not a FLEX disk image"));
    Ok(())
}

#[test]
fn put_then_extract_round_trip() -> STDRESULT {
    let dir = tempfile::tempdir()?;
    let dimg = dir.path().join("test.dsk");
    let host = dir.path().join("hello.txt");
    let content = b"hello from the host side\r";
    std::fs::write(&host,content)?;
    let mut cmd = Command::cargo_bin("flexkit")?;
    cmd.arg("mkdsk").arg("-d").arg(&dimg).assert().success();
    let mut cmd = Command::cargo_bin("flexkit")?;
    cmd.current_dir(dir.path())
        .arg("put").arg("hello.txt").arg("-d").arg(&dimg)
        .assert()
        .success();
    let mut cmd = Command::cargo_bin("flexkit")?;
    cmd.current_dir(dir.path())
        .arg("extract").arg("test.dsk").arg("-b")
        .assert()
        .success()
        .stdout(predicate::str::contains("1 file(s) extracted"));
    let back = std::fs::read(dir.path().join("test").join("hello.txt"))?;
    assert_eq!(&back[0..content.len()],content);
    assert!(back[content.len()..].iter().all(|b| *b==0));
    Ok(())
}

#[test]
fn delete_missing_file_is_partial() -> STDRESULT {
    let dir = tempfile::tempdir()?;
    let dimg = dir.path().join("test.dsk");
    let mut cmd = Command::cargo_bin("flexkit")?;
    cmd.arg("mkdsk").arg("-d").arg(&dimg).assert().success();
    let mut cmd = Command::cargo_bin("flexkit")?;
    cmd.arg("delete").arg("NOSUCH.BIN").arg("-d").arg(&dimg)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("NOSUCH.BIN"));
    Ok(())
}

#[test]
fn pack_unpack_pipeline() -> STDRESULT {
    let mut cmd = Command::cargo_bin("flexkit")?;
    cmd.arg("pack")
        .write_stdin("    hello\nworld\n")
        .assert()
        .success()
        .stdout(predicate::eq(b"\t\x04hello\rworld\r" as &[u8]));
    let mut cmd = Command::cargo_bin("flexkit")?;
    cmd.arg("unpack")
        .write_stdin(b"\t\x04hello\rworld\r" as &[u8])
        .assert()
        .success()
        .stdout(predicate::eq(b"    hello\nworld\n" as &[u8]));
    Ok(())
}

#[test]
fn mot2cmd_default_output_name() -> STDRESULT {
    let dir = tempfile::tempdir()?;
    std::fs::write(dir.path().join("prog.s19"),
        "S1130000000102030405060708090A0B0C0D0E0F74\nS9030000FC\n")?;
    let mut cmd = Command::cargo_bin("flexkit")?;
    cmd.current_dir(dir.path())
        .arg("mot2cmd").arg("prog.s19")
        .assert()
        .success();
    let cmd_file = std::fs::read(dir.path().join("prog.CMD"))?;
    assert_eq!(cmd_file.len(),252);
    assert_eq!(&cmd_file[0..4],&[0x02,0x00,0x00,0x10]);
    Ok(())
}
