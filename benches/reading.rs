//! Benchmarks for reading and writing hypertext markup.
//!
//! Run with: cargo bench

use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};

use hyperdoc::markup::{self, ReadOptions, WriteOptions};
use hyperdoc::StyleSheet;

/// A large document mixing every kind of element the reader handles.
fn sample_markup(sections: usize) -> String {
    let mut out = String::from("<TITLE>Benchmark</TITLE>\n<NEXTID N=\"z1\">\n");
    for i in 0..sections {
        out.push_str(&format!("<H2>Section {i}</H2>\n"));
        out.push_str("<P>Some body text with a ");
        out.push_str(&format!("<A NAME=\"a{i}\" HREF=\"doc{i}.html#z3\">link</A>"));
        out.push_str(" &amp; an entity, then more text to fill the line.</P>\n");
        out.push_str("<UL>\n<LI>first item\n<LI>second item\n</UL>\n");
        out.push_str("<DL><DT>Term<DD>Definition text</DL>\n");
        out.push_str("<XMP>  preformatted\n    example</XMP>\n");
    }
    out
}

// ============================================================================
// Reading
// ============================================================================

fn bench_read(c: &mut Criterion) {
    let sheet = StyleSheet::standard();
    let input = sample_markup(2000);
    let options = ReadOptions::default();

    c.bench_function("read_markup", |b| {
        b.iter(|| markup::read(black_box(&input), &sheet, &options).unwrap());
    });

    let (tokens, _) = markup::tokenize(&input);
    assert!(!tokens.is_empty());
    c.bench_function("tokenize_markup", |b| {
        b.iter(|| markup::tokenize(black_box(&input)).0.len());
    });
}

// ============================================================================
// Writing
// ============================================================================

fn bench_write(c: &mut Criterion) {
    let sheet = StyleSheet::standard();
    let input = sample_markup(2000);
    let doc = markup::read(&input, &sheet, &ReadOptions::default())
        .unwrap()
        .document;
    let options = WriteOptions::default();

    c.bench_function("write_markup", |b| {
        b.iter(|| markup::write(black_box(&doc), &sheet, &options).unwrap());
    });
}

criterion_group!(benches, bench_read, bench_write);
criterion_main!(benches);
