//! Benchmarks for the chatharvest transform and filter paths.
//!
//! Run with: `cargo bench`
//! Run specific group: `cargo bench --bench transform -- normalize`

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use serde_json::json;

use chatharvest::core::filter::{DateWindow, filter_conversations};
use chatharvest::core::models::{
    ApiMessage, ChannelDirectory, Contact, Conversation, ConversationMeta, MessageSender,
    NormalizedRecord,
};
use chatharvest::core::output::to_json;
use chatharvest::core::transform::records_for_conversation;

// =============================================================================
// Test Data Generators
// =============================================================================

// 2025-01-01T00:00:00Z
const BASE_EPOCH: i64 = 1_735_689_600;

fn directory() -> ChannelDirectory {
    [(101, "WhatsApp".to_string()), (102, "Email".to_string())]
        .into_iter()
        .collect()
}

fn generate_conversation(id: i64) -> Conversation {
    Conversation {
        id,
        inbox_id: Some(101),
        last_activity_at: Some(BASE_EPOCH + id * 3600),
        meta: ConversationMeta {
            sender: Some(Contact {
                name: Some("Maria Silva".to_string()),
                email: Some("maria@example.com".to_string()),
            }),
        },
    }
}

fn generate_messages(count: usize) -> Vec<ApiMessage> {
    (0..count)
        .map(|i| {
            let from_agent = i % 2 == 1;
            ApiMessage {
                message_type: Some(json!(if from_agent { "outgoing" } else { "incoming" })),
                content: Some(format!("Message number {i}")),
                created_at: Some(json!(BASE_EPOCH + i as i64 * 60)),
                sender: from_agent.then(|| MessageSender {
                    kind: Some("User".to_string()),
                    name: Some("Ana".to_string()),
                    email: Some("ana@company.com".to_string()),
                }),
            }
        })
        .collect()
}

fn generate_conversations(count: usize) -> Vec<Conversation> {
    (0..count).map(|i| generate_conversation(i as i64)).collect()
}

fn generate_records(count: usize) -> Vec<NormalizedRecord> {
    let conversation = generate_conversation(1);
    records_for_conversation(&conversation, &generate_messages(count), &directory(), None)
}

// =============================================================================
// Normalization Benchmarks
// =============================================================================

fn bench_normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize");
    let directory = directory();
    let conversation = generate_conversation(1);
    let window = DateWindow::from_dates("2025-01-01", "2025-01-31").unwrap();

    for size in [100_usize, 1_000, 10_000] {
        let messages = generate_messages(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(size),
            &messages,
            |b, messages| {
                b.iter(|| {
                    let records = records_for_conversation(
                        black_box(&conversation),
                        black_box(messages),
                        &directory,
                        Some(&window),
                    );
                    black_box(records)
                });
            },
        );
    }
    group.finish();
}

// =============================================================================
// Filter Benchmarks
// =============================================================================

fn bench_filter_conversations(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter_conversations");
    let window = DateWindow::from_dates("2025-01-01", "2025-01-31").unwrap();

    for size in [1_000_usize, 10_000, 100_000] {
        let conversations = generate_conversations(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(size),
            &conversations,
            |b, conversations| {
                b.iter(|| {
                    let retained =
                        filter_conversations(black_box(conversations.clone()), Some(&window));
                    black_box(retained)
                });
            },
        );
    }
    group.finish();
}

// =============================================================================
// Output Benchmarks
// =============================================================================

fn bench_output_json(c: &mut Criterion) {
    let mut group = c.benchmark_group("output_json");

    for size in [100_usize, 1_000, 10_000] {
        let records = generate_records(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(size),
            &records,
            |b, records| {
                b.iter(|| {
                    let json = to_json(black_box(records)).unwrap();
                    black_box(json)
                });
            },
        );
    }
    group.finish();
}

// =============================================================================
// Criterion Configuration
// =============================================================================

criterion_group!(
    benches,
    bench_normalize,
    bench_filter_conversations,
    bench_output_json,
);

criterion_main!(benches);
