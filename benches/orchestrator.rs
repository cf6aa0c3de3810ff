//! Orchestrator hot-path benchmarks
//!
//! Benchmarks for the generation pipeline with a stub engine:
//! - Buffered generation end to end (template, generate, decode, slice)
//! - Streaming generation with per-token decoding
//! - Chat template rendering alone
//! - Ready-state fast path of the idempotent load check

use async_trait::async_trait;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use muse_engine::chat::{ChatMlTemplate, ChatTemplate, Conversation};
use muse_engine::config::EngineConfig;
use muse_engine::device::{Backend, FixedProbe};
use muse_engine::orchestrator::{GenerateOptions, Orchestrator};
use muse_engine::provider::{
    CausalModel, ChatTokenizer, GenerationParams, LoadRequest, ModelProvider, TokenSink,
};
use std::hint::black_box;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Runtime;

/// Tokenizer that hashes words to ids; decode emits fixed-width fragments.
struct BenchTokenizer;

impl ChatTokenizer for BenchTokenizer {
    fn encode(&self, text: &str) -> anyhow::Result<Vec<u32>> {
        Ok(text
            .split_whitespace()
            .map(|w| w.bytes().fold(0u32, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u32)))
            .collect())
    }

    fn decode(&self, ids: &[u32], _skip_special: bool) -> anyhow::Result<String> {
        Ok(ids.iter().map(|id| format!("t{id} ")).collect())
    }

    fn apply_chat_template(&self, conversation: &Conversation) -> anyhow::Result<Vec<u32>> {
        self.encode(&ChatMlTemplate::new().apply(conversation))
    }
}

/// Model producing a fixed-length synthetic continuation.
struct BenchModel {
    continuation_len: usize,
}

#[async_trait]
impl CausalModel for BenchModel {
    async fn generate(
        &self,
        input_ids: &[u32],
        _params: &GenerationParams,
        on_token: Option<&TokenSink>,
    ) -> anyhow::Result<Vec<u32>> {
        let mut output = input_ids.to_vec();
        for i in 0..self.continuation_len {
            let id = 1000 + i as u32;
            if let Some(sink) = on_token {
                sink(id);
            }
            output.push(id);
        }
        Ok(output)
    }
}

struct BenchProvider {
    continuation_len: usize,
}

#[async_trait]
impl ModelProvider for BenchProvider {
    async fn load_tokenizer(
        &self,
        _request: &LoadRequest,
    ) -> anyhow::Result<Arc<dyn ChatTokenizer>> {
        Ok(Arc::new(BenchTokenizer))
    }

    async fn load_model(&self, _request: &LoadRequest) -> anyhow::Result<Arc<dyn CausalModel>> {
        Ok(Arc::new(BenchModel {
            continuation_len: self.continuation_len,
        }))
    }
}

fn bench_engine(rt: &Runtime, continuation_len: usize) -> Arc<Orchestrator> {
    let config = EngineConfig {
        model_id: "bench-org/bench-model".to_string(),
        local_model_dir: PathBuf::from("bundle"),
        cache_dir: None,
        force_backend: None,
    };
    let engine = Arc::new(Orchestrator::with_probe(
        config,
        Arc::new(BenchProvider { continuation_len }),
        Arc::new(FixedProbe::new(Backend::PortableFallback)),
    ));
    rt.block_on(engine.load_model()).unwrap();
    engine
}

fn bench_buffered_generation(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("generate_buffered");

    for tokens in [16, 128, 512] {
        let engine = bench_engine(&rt, tokens);
        group.bench_with_input(BenchmarkId::new("tokens", tokens), &engine, |b, engine| {
            b.to_async(&rt).iter(|| async {
                let output = engine
                    .generate("What is Rust?", GenerateOptions::default())
                    .await
                    .unwrap();
                black_box(output);
            });
        });
    }
    group.finish();
}

fn bench_streaming_generation(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("generate_streaming");

    for tokens in [16, 128, 512] {
        let engine = bench_engine(&rt, tokens);
        group.bench_with_input(BenchmarkId::new("tokens", tokens), &engine, |b, engine| {
            b.to_async(&rt).iter(|| async {
                let options = GenerateOptions {
                    stream: true,
                    on_token: Some(Arc::new(|fragment: &str| {
                        black_box(fragment.len());
                    })),
                    ..Default::default()
                };
                let output = engine.generate("What is Rust?", options).await.unwrap();
                black_box(output);
            });
        });
    }
    group.finish();
}

fn bench_template_render(c: &mut Criterion) {
    let template = ChatMlTemplate::new();
    let conversation = Conversation::exchange(
        "You are a helpful AI assistant.",
        "Explain ownership and borrowing in three sentences.",
    );

    c.bench_function("chatml_render", |b| {
        b.iter(|| black_box(template.apply(black_box(&conversation))));
    });
}

fn bench_ready_fast_path(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let engine = bench_engine(&rt, 16);

    // Measures the already-loaded short circuit, not a real load
    c.bench_function("load_model_ready", |b| {
        b.to_async(&rt).iter(|| async {
            engine.load_model().await.unwrap();
        });
    });
}

criterion_group!(
    benches,
    bench_buffered_generation,
    bench_streaming_generation,
    bench_template_render,
    bench_ready_fast_path
);
criterion_main!(benches);
