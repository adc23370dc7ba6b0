// Drives the compiled binary through a PTY so the real event loop,
// crossterm input handling and countdown thread are all exercised.
//
// Requires a TTY (expectrl allocates a pseudo terminal), so it is Unix-only
// and ignored by default. Run with:
// `cargo test --test integration_min_session -- --ignored`.

#![cfg(unix)]

use std::time::Duration;

use expectrl::{spawn, Eof};

#[test]
#[ignore]
fn quiz_played_to_the_end_is_recorded() -> Result<(), Box<dyn std::error::Error>> {
    let home = tempfile::tempdir()?;
    let db = home.path().join("quizr.db");
    let config = home.path().join("config.json");
    let bin = assert_cmd::cargo::cargo_bin("quizr");
    let cmd = format!(
        "env HOME={home} {bin} --quiz 1 --user pty --db {db} --config {config}",
        home = home.path().display(),
        bin = bin.display(),
        db = db.display(),
        config = config.display(),
    );

    let mut p = spawn(cmd)?;
    std::thread::sleep(Duration::from_millis(300));

    // quiz "1" answers: 3rd, 2nd, 3rd
    for answer in ["3", "2", "3"] {
        p.send(answer)?;
        p.send("\r")?;
        std::thread::sleep(Duration::from_millis(100));
    }

    // results screen: (q)uit
    p.send("q")?;
    p.expect(Eof)?;

    let output = assert_cmd::Command::cargo_bin("quizr")?
        .env("HOME", home.path())
        .args(["--leaderboard", "--config"])
        .arg(&config)
        .arg("--db")
        .arg(&db)
        .output()?;
    let stdout = String::from_utf8(output.stdout)?;
    assert!(stdout.contains("50 pts"), "leaderboard was: {stdout}");
    Ok(())
}
