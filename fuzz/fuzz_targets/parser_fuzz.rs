#![no_main]
use libfuzzer_sys::fuzz_target;

const SUBCOMMANDS: [&str; 5] = ["diff", "patch", "info", "config", ""];

fuzz_target!(|data: &[u8]| {
    let Some((&pick, rest)) = data.split_first() else {
        return;
    };

    // Lead with a real subcommand most of the time so flag parsing is reached.
    let mut args: Vec<String> = Vec::new();
    let sub = SUBCOMMANDS[pick as usize % SUBCOMMANDS.len()];
    if !sub.is_empty() {
        args.push(sub.to_string());
    }
    args.extend(
        String::from_utf8_lossy(rest)
            .split_whitespace()
            .take(16)
            .map(str::to_string),
    );
    oxidiff::cli::fuzz_try_parse_args(&args);
});
