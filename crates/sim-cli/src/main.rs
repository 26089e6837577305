//! 트레이딩 시뮬레이션 CLI.
//!
//! # 사용 예시
//!
//! ```bash
//! # CSV 데이터로 백테스트 실행
//! simbot backtest -c config/sim.toml -d data/bars.csv
//!
//! # 결과를 JSON으로 저장
//! simbot backtest -c config/sim.toml -d data/bars.csv -o report.json
//!
//! # 재생 피드 기반 라이브 페이퍼 루프 (Ctrl-C로 정지)
//! simbot live -c config/sim.toml -d data/bars.csv
//! ```

use clap::{Parser, Subcommand};
use tracing::error;

mod commands;

#[derive(Parser)]
#[command(name = "simbot")]
#[command(about = "멀티 에이전트 트레이딩 시뮬레이터", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 과거 데이터로 백테스트 실행
    Backtest {
        /// 시뮬레이션 설정 파일 (TOML)
        #[arg(short, long)]
        config: String,

        /// 바 데이터 CSV 경로 (symbol,timestamp,open,high,low,close,volume)
        #[arg(short, long)]
        data: String,

        /// 결과 JSON 출력 경로
        #[arg(short, long)]
        output: Option<String>,
    },

    /// 재생 피드 기반 라이브 페이퍼 루프 실행
    Live {
        /// 시뮬레이션 설정 파일 (TOML)
        #[arg(short, long)]
        config: String,

        /// 바 데이터 CSV 경로 (피드로 재생)
        #[arg(short, long)]
        data: String,

        /// 이벤트 로그 출력 경로 (JSONL)
        #[arg(short, long, default_value = "events.jsonl")]
        events: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    if let Err(err) = sim_core::logging::init_logging_from_env() {
        eprintln!("로깅 초기화 실패: {err}");
    }

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Backtest {
            config,
            data,
            output,
        } => commands::backtest::run(&config, &data, output.as_deref()).await,
        Commands::Live {
            config,
            data,
            events,
        } => commands::live::run(&config, &data, &events).await,
    };

    if let Err(err) = &result {
        error!(error = %err, "명령 실행 실패");
    }
    result
}
