//! 命令行入口: 分析一个分割体数据 (或 JSON 网格) 并在标准输出打印 JSON 记录.
//!
//! 用法: `nephro-run [INPUT]`. 其余参数见 [`loader`] 与 `nephro_core::config`.

use std::process::ExitCode;

use nephro_core::config::PipelineConfig;
use nephro_core::report::ErrorRecord;
use simple_logger::SimpleLogger;

mod loader;
mod runner;

/// 获得可并行核心数.
fn cpus() -> usize {
    std::thread::available_parallelism().map_or_else(|_| num_cpus::get(), usize::from)
}

fn emit(record: &ErrorRecord) -> ExitCode {
    match record.to_json() {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("{}: {e}", record.message),
    }
    ExitCode::FAILURE
}

fn main() -> ExitCode {
    if let Err(e) = SimpleLogger::new()
        .with_level(loader::log_level_from_env())
        .init()
    {
        eprintln!("日志初始化失败: {e}");
    }
    log::info!("可用核心数 {}", cpus());

    let setup = || -> nephro_core::error::AnalysisResult<_> {
        Ok((
            loader::input_from_args_env_or_home()?,
            loader::creatinine_from_env()?,
            PipelineConfig::from_env()?,
        ))
    };
    let (input, creatinine, config) = match setup() {
        Ok(v) => v,
        Err(e) => return emit(&ErrorRecord::from(&e)),
    };
    log::info!("输入 {input:?}, 配置 {config:?}");

    let segmenter = loader::segmenter_from_env();
    match runner::run(&input, creatinine, segmenter.as_ref(), config) {
        Ok(record) => match record.to_json() {
            Ok(s) => {
                println!("{s}");
                ExitCode::SUCCESS
            }
            Err(e) => emit(&ErrorRecord::from(&e)),
        },
        Err(record) => emit(&record),
    }
}
