//! 流式距离变换消融实验: 比较三种切片存储后端的耗时, 并与暴力求解的结果比对.
//!
//! 配置通过 `$EDT_*` 环境变量加载, 见 `EdtConfig::from_env`.

mod profile;
mod result;
mod runner;

use edt_berry::EdtConfig;
use std::process::ExitCode;

/// 与参考实现比对时允许的最大绝对误差.
const TOLERANCE: f32 = 1e-3;

fn main() -> ExitCode {
    utils::init_logger();
    let cfg = match EdtConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            log::error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let result = runner::run(&cfg);
    if let Err(e) = result.analyze() {
        log::error!("无法输出实验结果: {e}");
        return ExitCode::FAILURE;
    }
    if result.is_success(TOLERANCE) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
