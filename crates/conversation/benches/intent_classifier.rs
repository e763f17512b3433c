use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use glasserp_conversation::{DialogState, LineItemParser, classify};

fn bench_classify(c: &mut Criterion) {
    let cases = [
        ("cancel", "Hủy", DialogState::Confirming),
        ("phone", "+84 912 345 678", DialogState::WaitingForPhone),
        ("product_line", "EI90 MB 1000*2000*25mm 2", DialogState::WaitingForProductInfo),
        ("confirm", "Xác nhận", DialogState::Confirming),
        ("staff_relay", "Cho tôi hỏi giá kính cường lực 10mm", DialogState::ContactingStaff),
        ("unknown", "Xin chào shop", DialogState::New),
    ];

    let mut group = c.benchmark_group("classify");
    group.throughput(Throughput::Elements(1));
    for (name, text, state) in cases {
        group.bench_with_input(BenchmarkId::from_parameter(name), &(text, state), |b, (text, state)| {
            b.iter(|| classify(black_box(text), black_box(*state)))
        });
    }
    group.finish();
}

fn bench_line_parser(c: &mut Criterion) {
    let message = (0..20)
        .map(|i| format!("EI{} MB {}*2000*25mm {}", 30 + i, 500 + i * 10, i + 1))
        .collect::<Vec<_>>()
        .join("\n");

    let mut group = c.benchmark_group("line_item_parser");
    group.throughput(Throughput::Elements(20));
    group.bench_function("twenty_lines", |b| {
        b.iter(|| LineItemParser::parse_text(black_box(&message)))
    });
    group.finish();
}

criterion_group!(benches, bench_classify, bench_line_parser);
criterion_main!(benches);
