//! 算法运行统计.

use std::time::{Duration, Instant};

/// ablation/benchmark 计时器.
///
/// 该计时器支持 "中途中断" 与 "结束中断, 继续开始计时".
#[derive(Clone, Debug)]
struct AccTimer {
    consumed: Duration,
    since: Instant,
}

impl AccTimer {
    /// 初始化计时器. 初始化时会视为已经开始计时 (`self.start()`).
    #[inline]
    pub fn new() -> Self {
        Self {
            consumed: Duration::from_secs(0),
            since: Instant::now(),
        }
    }

    /// 开始计时.
    #[inline]
    pub fn start(&mut self) {
        self.since = Instant::now();
    }

    /// 结束计时, 并将这一区间的时间累加. 返回本轮计时时长.
    ///
    /// # 注意
    ///
    /// 上一次调用必须是 `self.start()`, 否则计算时间值无意义.
    #[inline]
    pub fn elapsed(&mut self) -> Duration {
        let d = self.since.elapsed();
        self.consumed += d;
        d
    }

    /// 获得总共累计下来的时间 (以微秒为单位).
    #[inline]
    pub fn get_total_us(&self) -> u64 {
        self.consumed.as_micros() as u64
    }

    /// 获得总共累计下来的时间 (以秒为单位).
    #[inline]
    pub fn get_total_secs(&self) -> f64 {
        self.consumed.as_secs_f64()
    }
}

impl Default for AccTimer {
    fn default() -> Self {
        Self::new()
    }
}

/// ablation/benchmark 数据统计.
#[derive(Clone, Debug)]
pub struct Profile {
    /// 成功完成变换的体数据个数.
    volumes: u64,

    /// 变换失败的体数据个数.
    failed: u64,

    /// 成功完成变换的体数据的切片总数.
    slices: u64,

    /// 变换花费的总时间 (包括切片存储的 I/O 时间).
    transform_time: AccTimer,

    /// 整个任务花费的总时间 (包括构造输出存储, 与参考实现比对的时间).
    real_time: AccTimer,

    /// 最耗时的一次变换所消耗的时间.
    most: Option<Duration>,

    /// 与参考实现比对过的体数据个数.
    checked: u64,

    /// 与参考实现比对时的最大绝对误差.
    max_abs_err: f32,
}

impl Profile {
    /// 初始化.
    #[inline]
    pub fn new() -> Self {
        Self {
            volumes: 0,
            failed: 0,
            slices: 0,
            transform_time: AccTimer::default(),
            real_time: AccTimer::default(),
            most: None,
            checked: 0,
            max_abs_err: 0.0,
        }
    }

    /// 开始一次新的变换计时.
    #[inline]
    pub fn transform_start(&mut self) {
        self.transform_time.start();
    }

    /// 结束一次变换计时.
    #[inline]
    pub fn transform_elapsed(&mut self) {
        let d = self.transform_time.elapsed();
        self.most = Some(self.most.map_or(d, |m| m.max(d)));
    }

    /// 记录一个成功完成变换的、含有 `slices` 张切片的体数据.
    #[inline]
    pub fn count_volume(&mut self, slices: usize) {
        self.volumes += 1;
        self.slices += slices as u64;
    }

    /// 记录一次失败的变换.
    #[inline]
    pub fn count_failed(&mut self) {
        self.failed += 1;
    }

    /// 记录一次与参考实现的比对结果.
    #[inline]
    pub fn count_checked(&mut self, max_abs_err: f32) {
        self.checked += 1;
        self.max_abs_err = self.max_abs_err.max(max_abs_err);
    }

    /// 结束全部计时.
    #[inline]
    pub fn finish(mut self) -> Self {
        self.real_time.elapsed();
        self
    }

    /// 获得成功的体数据个数.
    #[inline]
    pub fn get_volumes(&self) -> u64 {
        self.volumes
    }

    /// 获得失败的体数据个数.
    #[inline]
    pub fn get_failed(&self) -> u64 {
        self.failed
    }

    /// 获得切片总数.
    #[inline]
    pub fn get_slices(&self) -> u64 {
        self.slices
    }

    /// 以微秒为单位获得变换的总花费自然时间.
    #[inline]
    pub fn get_transform_time_us(&self) -> u64 {
        self.transform_time.get_total_us()
    }

    /// 以微秒为单位获得任务运行到目前的总自然时间.
    #[inline]
    pub fn get_real_time_us(&self) -> u64 {
        self.real_time.get_total_us()
    }

    /// 每秒处理的切片数.
    #[inline]
    pub fn get_slices_per_sec(&self) -> Option<f64> {
        let secs = self.transform_time.get_total_secs();
        (self.slices > 0 && secs > 0.0).then(|| self.slices as f64 / secs)
    }

    /// 获得与参考实现比对过的体数据个数.
    #[inline]
    pub fn get_checked(&self) -> u64 {
        self.checked
    }

    /// 获得比对时的最大绝对误差. 如果没有比对过, 则返回 `None`.
    #[inline]
    pub fn get_max_abs_err(&self) -> Option<f32> {
        (self.checked > 0).then_some(self.max_abs_err)
    }

    /// 获取最耗时的一次变换所消耗的时间. 如果不存在任务, 则返回 `None`.
    #[inline]
    pub fn get_most_time_consuming(&self) -> Option<Duration> {
        self.most
    }
}

impl Default for Profile {
    fn default() -> Self {
        Self::new()
    }
}
