use std::hint::black_box;
use std::time::Instant;

fn main() {
    let small_source = r#"package store

import "fmt"

type Record struct {
    ID   int
    Name string
}

func Get(id int) string {
    var rec Record
    return rec.Name
}
"#;

    let medium_source = generate_source(50);
    let large_source = generate_source(500);

    println!("=== Skiff Parser Benchmarks ===\n");

    // Benchmark lexing
    println!("--- Lexing ---");
    bench("lex small (~150 bytes)", 10000, || {
        black_box(skiff_syntax::lex(small_source))
    });
    bench("lex medium (~10KB)", 1000, || {
        black_box(skiff_syntax::lex(&medium_source))
    });
    bench("lex large (~100KB)", 100, || {
        black_box(skiff_syntax::lex(&large_source))
    });

    println!("\n--- Lexing (non-trivia only) ---");
    bench("lex_non_trivia small", 10000, || {
        black_box(skiff_syntax::lex_non_trivia(small_source))
    });
    bench("lex_non_trivia medium", 1000, || {
        black_box(skiff_syntax::lex_non_trivia(&medium_source))
    });
    bench("lex_non_trivia large", 100, || {
        black_box(skiff_syntax::lex_non_trivia(&large_source))
    });

    println!("\n--- Parsing ---");
    bench("parse small (~150 bytes)", 10000, || {
        black_box(skiff_syntax::parse(small_source))
    });
    bench("parse medium (~10KB)", 1000, || {
        black_box(skiff_syntax::parse(&medium_source))
    });
    bench("parse large (~100KB)", 100, || {
        black_box(skiff_syntax::parse(&large_source))
    });

    println!("\n--- FileSymbols ---");
    let small_result = skiff_syntax::parse(small_source);
    let medium_result = skiff_syntax::parse(&medium_source);
    let large_result = skiff_syntax::parse(&large_source);

    bench("index small", 10000, || {
        black_box(skiff_syntax::FileSymbols::build(&small_result.root))
    });
    bench("index medium", 1000, || {
        black_box(skiff_syntax::FileSymbols::build(&medium_result.root))
    });
    bench("index large", 100, || {
        black_box(skiff_syntax::FileSymbols::build(&large_result.root))
    });

    println!("\n--- FileSymbols::find ---");
    let small_index = skiff_syntax::FileSymbols::build(&small_result.root);
    let medium_index = skiff_syntax::FileSymbols::build(&medium_result.root);
    let large_index = skiff_syntax::FileSymbols::build(&large_result.root);

    bench("find small (existing)", 100000, || {
        black_box(small_index.find("Get"))
    });
    bench("find medium (existing)", 100000, || {
        black_box(medium_index.find("Get25"))
    });
    bench("find large (existing)", 100000, || {
        black_box(large_index.find("Get250"))
    });
    bench("find large (not found)", 100000, || {
        black_box(large_index.find("nonexistent"))
    });

    println!("\n--- SourceText ---");
    bench("SourceText::new small", 10000, || {
        black_box(skiff_syntax::SourceText::new(small_source))
    });
    bench("SourceText::new medium", 1000, || {
        black_box(skiff_syntax::SourceText::new(medium_source.as_str()))
    });
    bench("SourceText::new large", 100, || {
        black_box(skiff_syntax::SourceText::new(large_source.as_str()))
    });

    let small_text = skiff_syntax::SourceText::new(small_source);
    let large_text = skiff_syntax::SourceText::new(large_source.as_str());

    bench("SourceText::position small", 100000, || {
        black_box(small_text.position(50))
    });
    bench("SourceText::position large (middle)", 100000, || {
        black_box(large_text.position(60000))
    });

    println!("\n--- Full LSP Flow (parse + symbols + text) ---");
    bench("full flow small", 10000, || {
        let result = skiff_syntax::parse(small_source);
        let _symbols = skiff_syntax::FileSymbols::build(&result.root);
        let _text = skiff_syntax::SourceText::new(small_source);
        black_box(result)
    });
    bench("full flow medium", 1000, || {
        let result = skiff_syntax::parse(&medium_source);
        let _symbols = skiff_syntax::FileSymbols::build(&result.root);
        let _text = skiff_syntax::SourceText::new(medium_source.as_str());
        black_box(result)
    });
    bench("full flow large", 100, || {
        let result = skiff_syntax::parse(&large_source);
        let _symbols = skiff_syntax::FileSymbols::build(&result.root);
        let _text = skiff_syntax::SourceText::new(large_source.as_str());
        black_box(result)
    });

    // Memory info
    println!("\n--- Source Sizes ---");
    println!("small:  {} bytes", small_source.len());
    println!("medium: {} bytes", medium_source.len());
    println!("large:  {} bytes", large_source.len());

    // Token counts
    let small_tokens = skiff_syntax::lex(small_source);
    let medium_tokens = skiff_syntax::lex(&medium_source);
    let large_tokens = skiff_syntax::lex(&large_source);
    println!("\n--- Token Counts ---");
    println!("small:  {} tokens", small_tokens.len());
    println!("medium: {} tokens", medium_tokens.len());
    println!("large:  {} tokens", large_tokens.len());

    // Symbol counts
    println!("\n--- Symbol Counts ---");
    println!("small:  {} symbols", small_index.symbols().len());
    println!("medium: {} symbols", medium_index.symbols().len());
    println!("large:  {} symbols", large_index.symbols().len());
}

fn bench<F, R>(name: &str, iterations: u32, mut f: F)
where
    F: FnMut() -> R,
{
    // Warmup
    for _ in 0..10 {
        black_box(f());
    }

    let start = Instant::now();
    for _ in 0..iterations {
        black_box(f());
    }
    let elapsed = start.elapsed();
    let per_iter = elapsed / iterations;

    println!(
        "{:45} {:>10.2?}/iter ({} iterations)",
        name, per_iter, iterations
    );
}

fn generate_source(decls: u32) -> String {
    let mut source = String::from("package benchmark\n\nimport \"fmt\"\n\n");

    for i in 0..decls {
        source.push_str(&format!(
            r#"type Record{i} struct {{
    ID   int
    Name string
    Tags []string
}}

func (r Record{i}) Label{i}() string {{
    return r.Name
}}

func Get{i}(id int) Record{i} {{
    var rec Record{i}
    fmt.Println(id)
    return rec
}}

var store{i} []*Record{i}

"#
        ));
    }

    source
}
