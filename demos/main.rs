use log::info;
use sequitur_grammar::{Grammar, GrammarConfig, Symbol};
use std::env;
use std::fs;

/// Builds a grammar from a file, verifies the reconstruction and prints
/// statistics.
///
/// Usage: cargo run --example main <filename> [--words]
///
/// With `--words` the file is split on whitespace and each word is a token;
/// otherwise every byte is a token. Set `RUST_LOG=debug` for progress.
fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 || args.len() > 3 || (args.len() == 3 && args[2] != "--words") {
        eprintln!("Usage: {} <filename> [--words]", args[0]);
        std::process::exit(1);
    }

    let filename = &args[1];
    let contents = fs::read(filename).unwrap_or_else(|_| {
        eprintln!("File \"{}\" not found.", filename);
        std::process::exit(1);
    });

    if args.len() == 3 {
        let text = String::from_utf8_lossy(&contents);
        let words: Vec<&str> = text.split_whitespace().collect();
        let grammar = build(words.iter().copied());
        report(&grammar, &words, |word| word.to_string());
    } else {
        let grammar = build(contents.iter().copied());
        report(&grammar, &contents, |byte| {
            if byte.is_ascii_graphic() {
                (*byte as char).to_string()
            } else {
                format!("\\x{byte:02x}")
            }
        });
    }
}

fn build<T, I>(tokens: I) -> Grammar<T>
where
    T: std::hash::Hash + Eq + Clone,
    I: ExactSizeIterator<Item = T>,
{
    let mut grammar = Grammar::with_config(GrammarConfig::new().with_capacity(tokens.len()));

    for (count, token) in tokens.enumerate() {
        grammar.consume(token);
        if (count + 1) % 100_000 == 0 {
            info!("{} tokens consumed, {} rules", count + 1, grammar.rule_count());
        }
    }

    grammar
}

fn report<T, F>(grammar: &Grammar<T>, input: &[T], render: F)
where
    T: std::hash::Hash + Eq + Clone,
    F: Fn(&T) -> String,
{
    let mut mismatches = 0usize;
    let mut produced = 0usize;
    for (position, (expected, actual)) in input.iter().zip(grammar.iter()).enumerate() {
        produced += 1;
        if expected != actual {
            mismatches += 1;
            eprintln!(
                "Mismatch at position {}: input={}, grammar={}",
                position,
                render(expected),
                render(actual)
            );
        }
    }
    if produced != input.len() {
        eprintln!("Grammar produced {} of {} tokens", produced, input.len());
    }

    let exported = grammar.export();
    println!("=== Start rule (first 20 symbols) ===");
    let preview: Vec<String> = exported
        .start()
        .iter()
        .take(20)
        .map(|symbol| match symbol {
            Symbol::Terminal(token) => render(token),
            Symbol::Nonterminal(id) => id.to_string(),
        })
        .collect();
    println!("S -> {}", preview.join(" "));

    let stats = grammar.stats();
    println!("\n=== Statistics ===");
    println!("Total tokens consumed: {}", stats.input_length);
    println!("Symbols in grammar: {}", stats.grammar_symbols);
    println!("Rules: {}", stats.num_rules);
    println!("Compression ratio: {:.2}%", stats.compression_ratio());
    println!("Mismatches: {}", mismatches);
}
