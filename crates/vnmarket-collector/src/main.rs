//! Standalone OHLCV collector / market breadth CLI.

use anyhow::Context;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use vnmarket_collector::{modules, CollectionStats, CollectorConfig};
use vnmarket_core::{init_logging, normalize_symbol, Clock, LogConfig, LogFormat, SystemClock};
use vnmarket_data::{
    BreadthParams, BreadthResultCache, HistoryParams, IntegrityStatus, MarketDataService, Pacing,
    PriceStore, UpdatePolicy,
};

#[derive(Parser)]
#[command(name = "vnmarket-collector")]
#[command(about = "VN market OHLCV cache updater and market breadth tool", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 설정 파일 경로
    #[arg(long, default_value = "config/default.toml")]
    config: PathBuf,

    /// 로그 레벨 (trace, debug, info, warn, error). 설정 파일보다 우선
    #[arg(long)]
    log_level: Option<String>,

    /// 로그 형식 (pretty, json, compact)
    #[arg(long)]
    log_format: Option<LogFormat>,
}

#[derive(Subcommand)]
enum Commands {
    /// OHLCV 증분 업데이트
    Update {
        /// 특정 종목만 (쉼표로 구분, 예: "VNM,HPG")
        #[arg(long)]
        symbols: Option<String>,

        /// 소스 디렉터리의 모든 종목 포함
        #[arg(long)]
        all: bool,

        /// 신선도와 무관하게 전체 구간 재수집
        #[arg(long)]
        force: bool,
    },

    /// Market Breadth 계산 (결과 캐시 우선)
    Breadth {
        /// 분석 종목 (기본: 캐시된 전체 종목)
        #[arg(long)]
        symbols: Option<String>,

        /// 최소 거래대금 (VND)
        #[arg(long)]
        min_trading_value: Option<u64>,

        /// 동시 분석 종목 수
        #[arg(long)]
        concurrency: Option<usize>,

        /// 결과 캐시 허용 나이 (분)
        #[arg(long)]
        max_age_minutes: Option<i64>,

        /// 가격 업데이트 후 다시 계산
        #[arg(long)]
        refresh: bool,

        /// JSON 출력
        #[arg(long)]
        json: bool,
    },

    /// 일자별 breadth 이력
    History {
        /// 기간 (일)
        #[arg(long)]
        days: Option<i64>,

        /// JSON 출력
        #[arg(long)]
        json: bool,
    },

    /// 캐시 통계
    Stats {
        /// 최근 갱신 종목 표시 수
        #[arg(long, default_value_t = 10)]
        recent: usize,
    },

    /// 메타데이터와 실제 봉 수 비교
    Verify {
        symbol: String,
    },

    /// 캐시 삭제 (종목 미지정 시 전체 + breadth 결과 캐시)
    Clear {
        #[arg(long)]
        symbol: Option<String>,
    },

    /// 데몬 모드: 주기적으로 업데이트 + breadth 재계산
    Daemon,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 설정 로드
    let config = CollectorConfig::load(&cli.config)
        .with_context(|| format!("설정 로드 실패: {}", cli.config.display()))?;

    // 로깅 초기화
    let mut log_config = LogConfig::from_settings(&config.app.logging);
    if let Some(level) = cli.log_level.clone() {
        log_config.level = level;
    }
    if let Some(format) = cli.log_format {
        log_config = log_config.with_format(format);
    }
    init_logging(log_config)?;

    tracing::info!("VN Market Collector 시작");
    tracing::debug!(database_url = %config.database_url, "설정 로드 완료");

    // 저장소 연결
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store = PriceStore::connect_with_clock(
        &config.database_url,
        config.app.cache.max_connections,
        clock.clone(),
    )
    .await
    .context("가격 캐시 연결 실패")?;

    let sources = modules::build_source(&config.source);
    let service = MarketDataService::new(
        store.clone(),
        sources.source.clone(),
        BreadthResultCache::new(&config.app.cache.breadth_cache_path, clock.clone()),
        clock,
        UpdatePolicy::from_config(&config.app.updater),
    );
    let pacing = Pacing::from_config(&config.app.updater);

    // 명령 실행
    match cli.command {
        Commands::Update {
            symbols,
            all,
            force,
        } => {
            let targets =
                modules::resolve_symbols(&service, &sources.listing, symbols.as_deref(), all)
                    .await?;
            let stats = modules::run_update(&service, &targets, force, pacing).await;
            stats.log_summary("OHLCV 업데이트");
        }
        Commands::Breadth {
            symbols,
            min_trading_value,
            concurrency,
            max_age_minutes,
            refresh,
            json,
        } => {
            let targets =
                modules::resolve_symbols(&service, &sources.listing, symbols.as_deref(), false)
                    .await?;

            let mut params = BreadthParams::from_config(&config.app.breadth);
            if let Some(value) = min_trading_value {
                params = params.with_min_trading_value(Decimal::from(value));
            }
            if let Some(n) = concurrency {
                params = params.with_concurrency(n);
            }
            let options = modules::BreadthOptions {
                params,
                max_age: max_age_minutes
                    .map(chrono::Duration::minutes)
                    .unwrap_or_else(|| config.app.breadth.cache_ttl()),
                refresh,
                pacing,
            };

            let response = modules::run_breadth(&service, &targets, &options).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&response.snapshot)?);
            } else {
                print!(
                    "{}",
                    modules::render_breadth_report(&response.snapshot, response.from_cache)
                );
            }
        }
        Commands::History { days, json } => {
            let mut params = HistoryParams::from_config(&config.app.breadth);
            if let Some(days) = days {
                params.days = days;
            }
            let points = service.breadth_history(&params).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&points)?);
            } else {
                print!("{}", modules::render_history(&points));
            }
        }
        Commands::Stats { recent } => {
            let stats = service.cache_stats(recent).await?;
            print!("{}", modules::render_cache_stats(&stats));
        }
        Commands::Verify { symbol } => {
            let symbol = normalize_symbol(&symbol)?;
            match service.verify_integrity(&symbol).await? {
                IntegrityStatus::Missing => println!("{}: 캐시 없음", symbol),
                IntegrityStatus::Consistent { count } => {
                    println!("{}: 정상 ({}개 봉)", symbol, count)
                }
                IntegrityStatus::Mismatch { recorded, actual } => println!(
                    "{}: 불일치 (메타데이터 {}, 실제 {}) - 다음 업데이트에서 전체 재수집",
                    symbol, recorded, actual
                ),
            }
        }
        Commands::Clear { symbol } => {
            let symbol = symbol.as_deref().map(normalize_symbol).transpose()?;
            let deleted = service.clear_cache(symbol.as_deref()).await?;
            tracing::info!(symbol = ?symbol, deleted = deleted, "캐시 삭제 완료");
        }
        Commands::Daemon => {
            tracing::info!(
                "=== 데몬 모드 시작 (주기: {}분) ===",
                config.daemon.interval_minutes
            );

            let params = BreadthParams::from_config(&config.app.breadth);
            let mut interval = tokio::time::interval(config.daemon.interval());
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {
                        tracing::info!("종료 신호 수신, 데몬 종료 중...");
                        break;
                    }
                    _ = interval.tick() => {
                        let started = Instant::now();
                        tracing::info!("=== 워크플로우 실행 시작 ===");

                        let targets = match modules::resolve_symbols(
                            &service,
                            &sources.listing,
                            None,
                            true,
                        )
                        .await
                        {
                            Ok(targets) => targets,
                            Err(e) => {
                                tracing::error!("종목 목록 조회 실패: {}", e);
                                continue;
                            }
                        };

                        // 1. OHLCV 업데이트
                        let mut stats: CollectionStats =
                            modules::run_update(&service, &targets, false, pacing).await;

                        // 2. breadth 재계산 (결과 캐시 갱신)
                        let snapshot = service.analyze_breadth(&targets, &params).await;
                        stats.record_breadth(&snapshot);
                        stats.elapsed = started.elapsed();
                        stats.log_summary("데몬 워크플로우");

                        tracing::info!(
                            "=== 워크플로우 완료, 다음 실행: {}분 후 ===",
                            config.daemon.interval_minutes
                        );
                    }
                }
            }
        }
    }

    store.pool().close().await;
    tracing::info!("VN Market Collector 종료");

    Ok(())
}
