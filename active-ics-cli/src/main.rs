mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "active-ics")]
#[command(about = "查询ICS日历在指定时刻正在进行的事件")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 启用详细日志
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// 列出指定时刻正在进行的事件
    Active {
        /// 日历来源（本地 .ics 文件路径或 http(s) URL）
        source: String,

        /// 查询时刻（RFC 3339，或 `YYYY-MM-DD HH:MM[:SS]` 本地时间），默认为当前时间
        #[arg(short, long)]
        at: Option<String>,

        /// 解释本地时间所用的时区，默认为日历自身的时区
        #[arg(short, long)]
        timezone: Option<String>,

        /// 日历未声明时区时使用的时区（也可通过 DEFAULT_TIMEZONE 设置）
        #[arg(long)]
        default_timezone: Option<String>,

        /// 输出格式
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// 查看日历中的事件分组与重复规则
    Inspect {
        /// 日历来源（本地 .ics 文件路径或 http(s) URL）
        source: String,

        /// 日历未声明时区时使用的时区（也可通过 DEFAULT_TIMEZONE 设置）
        #[arg(long)]
        default_timezone: Option<String>,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 设置日志级别
    let log_level = if cli.verbose { "debug" } else { "info" };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("active_ics_cli={log_level},active_ics_core={log_level}").into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Active {
            source,
            at,
            timezone,
            default_timezone,
            format,
        } => {
            commands::active_command(commands::ActiveParams {
                source,
                at,
                timezone,
                default_timezone,
                format,
            })
            .await
        }

        Commands::Inspect {
            source,
            default_timezone,
        } => commands::inspect_command(source, default_timezone).await,
    }
}
