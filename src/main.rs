use anyhow::{Context, Result};
use bexpr::{DumpConfig, Expression};
use clap::Parser;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "bexpr-dump")]
#[command(about = "Print JSON-encoded filter expression trees as indented text")]
struct Cli {
    /// Files holding one JSON-encoded expression tree each; reads interactively when omitted
    files: Vec<PathBuf>,
    /// Dump config file (defaults to ./bexpr_dump.json when present)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Indent unit repeated once per nesting level
    #[arg(long)]
    indent: Option<String>,
    /// Nesting level of the root node
    #[arg(long)]
    level: Option<usize>,
}

/// 根据命令行参数确定打印配置，显式指定的配置文件必须能加载
fn resolve_config(cli: &Cli) -> Result<DumpConfig> {
    let mut config = match &cli.config {
        Some(path) => DumpConfig::from_json_file(path)
            .with_context(|| format!("无法加载配置文件 {}", path.display()))?,
        None => DumpConfig::load_or_default(),
    };
    if let Some(indent) = &cli.indent {
        config.indent = indent.clone();
    }
    if let Some(level) = cli.level {
        config.level = level;
    }
    Ok(config)
}

fn parse_tree(json: &str) -> Result<Expression> {
    serde_json::from_str(json).context("无法解析表达式树JSON")
}

fn dump_file(path: &Path, config: &DumpConfig) -> Result<()> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("无法读取 {}", path.display()))?;
    let expr = parse_tree(&content).with_context(|| format!("{}", path.display()))?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    expr.dump(&mut out, &config.indent, config.level)
        .with_context(|| format!("无法打印 {}", path.display()))?;
    out.flush()?;
    Ok(())
}

/// 交互模式：每行输入一棵JSON编码的表达式树
fn run_repl(config: &DumpConfig) -> Result<()> {
    let mut rl = DefaultEditor::new()?;
    println!("--- bexpr-dump: 每行输入一棵JSON表达式树，:quit 退出 ---");

    loop {
        match rl.readline("bexpr> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if line == ":quit" {
                    break;
                }
                rl.add_history_entry(line)?;

                match parse_tree(line)
                    .and_then(|expr| Ok(expr.dump_to_string(&config.indent, config.level)?))
                {
                    Ok(text) => print!("{}", text),
                    Err(e) => println!("✗ {:#}", e),
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;
    log::debug!("using dump config {:?}", config);

    if cli.files.is_empty() {
        return run_repl(&config);
    }

    for path in &cli.files {
        dump_file(path, &config)?;
    }
    Ok(())
}
