//! # Fibonacci Caching Example
//!
//! This example compares a naive recursive Fibonacci against the same
//! recursion memoized in Redis:
//! - Connecting MemoHaus to a local Redis
//! - Recursive calls going back through the cache
//! - Cache hits on a repeated call
//!
//! Run with a Redis server on `REDIS_URL` (default `redis://localhost:6379`).
//! Note: `clear_on_start` flushes the selected Redis database.

use memohaus::prelude::*;
use std::future::Future;
use std::pin::Pin;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

fn fibonacci(n: u64) -> u64 {
    match n {
        0 => 0,
        1 => 1,
        _ => fibonacci(n - 1) + fibonacci(n - 2),
    }
}

fn fibonacci_cached<'a>(
    cache: &'a CacheManager<RedisStore>,
    n: u64,
) -> Pin<Box<dyn Future<Output = anyhow::Result<u64>> + 'a>> {
    Box::pin(async move {
        let value = cache
            .call_cached("demos::fibonacci_cached", (n,), |(n,): (u64,)| async move {
                if n < 2 {
                    return Ok::<u64, anyhow::Error>(n);
                }
                let a = fibonacci_cached(cache, n - 1).await?;
                let b = fibonacci_cached(cache, n - 2).await?;
                Ok(a + b)
            })
            .await?;
        Ok(value)
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    println!("🚀 MemoHaus Fibonacci Example");
    println!("=============================");

    let redis_url =
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
    let memohaus = MemoHaus::new(
        StoreConfig::new(redis_url, 3000),
        CacheConfig::new(512, "fibonacci".to_string(), true),
    )
    .await?;
    memohaus.health_check().await?;
    println!("✅ Redis connected");

    let n = 32;
    let start = Instant::now();
    println!("\nfibonacci({}) -> {}", n, fibonacci(n));
    println!("Duration without LRU cache: {:?}", start.elapsed());

    let n = 90;
    let start = Instant::now();
    println!("\nfibonacci_cached({}) -> {}", n, fibonacci_cached(memohaus.cache(), n).await?);
    println!("Duration with LRU cache: {:?}", start.elapsed());

    let start = Instant::now();
    println!("\nfibonacci_cached({}) -> {}", n, fibonacci_cached(memohaus.cache(), n).await?);
    println!("Duration of repeated call (cache hit): {:?}", start.elapsed());

    println!("\n📊 Entries tracked: {}", memohaus.cache().len().await?);

    Ok(())
}
