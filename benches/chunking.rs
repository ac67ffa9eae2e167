use criterion::{Criterion, criterion_group, criterion_main};
use legal_diligence::embeddings::{ChunkingConfig, chunk_pages};
use legal_diligence::extraction::PageText;
use std::hint::black_box;

const CLAUSES: [&str; 6] = [
    "The Borrower shall repay the principal amount together with interest at the agreed rate.",
    "Either party may terminate this Agreement upon thirty days written notice to the other.",
    "The Supplier shall indemnify the Customer against all losses arising from any breach.",
    "This Agreement shall be governed by the laws of the State of New York.",
    "A penalty of two percent per month applies to any amount not paid when due.",
    "No party may assign its rights under this Agreement without prior written consent.",
];

fn synthetic_pages(pages: u32) -> Vec<PageText> {
    (1..=pages)
        .map(|page| {
            let text = CLAUSES
                .iter()
                .cycle()
                .take(40)
                .copied()
                .collect::<Vec<_>>()
                .join(" ");
            PageText::new(page, text)
        })
        .collect()
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let pages = synthetic_pages(50);
    let config = ChunkingConfig::default();
    c.bench_function("chunking", |b| {
        b.iter(|| chunk_pages(black_box(&pages), 1, "contract.pdf", black_box(&config)))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
