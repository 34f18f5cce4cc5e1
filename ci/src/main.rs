use xshell::{cmd, Shell};

fn main() {
    let sh = Shell::new().expect("Shell create failed.");
    // Local runs use whatever the default Rust toolchain is; hosted CI pins
    // its own stable, so results can differ slightly.

    // See if any code needs to be formatted
    cmd!(sh, "cargo fmt --all -- --check")
        .run()
        .expect("Please run 'cargo fmt --all' to format your code.");

    // See if clippy has any complaints.
    cmd!(
        sh,
        "cargo clippy --workspace --all-targets -- -D warnings -W clippy::doc_markdown"
    )
    .run()
    .expect("Please fix clippy errors in output above.");

    // The registry core must build on its own, without the service crates.
    cmd!(sh, "cargo check --package dcn-registrar --lib")
        .run()
        .expect("Please fix check errors in output above.");

    // Tests already run on the hosted CI; passing `nonlocal` skips the
    // duplicate run there.
    let args: Vec<String> = std::env::args().collect();
    if args.get(1) != Some(&"nonlocal".to_string()) {
        cmd!(sh, "cargo test --workspace")
            .run()
            .expect("Please fix failing tests in output above.");

        // Doc tests are ignored by the plain `cargo test` run above
        cmd!(sh, "cargo test --doc --workspace")
            .run()
            .expect("Please fix failing doc-tests in output above.");
    }
}
