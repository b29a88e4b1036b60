//! 实验结果.

use crate::profile::Profile;
use std::io::{self, Write};

/// 将 `profile` 的结果写进 `w` 中.
fn describe_into<W: Write>(name: &str, p: &Profile, w: &mut W) -> io::Result<()> {
    const S4: &str = "    ";

    #[inline]
    fn f64_to_display(f: Option<f64>) -> String {
        match f {
            Some(f) => format!("{f:.3}"),
            None => "/".to_string(),
        }
    }

    #[inline]
    fn u64_to_display(u: Option<u64>) -> String {
        match u {
            Some(u) => u.to_string(),
            None => "/".to_string(),
        }
    }

    writeln!(w, "Profile `{name}`:")?;
    writeln!(w, "{S4}Volumes transformed: {}", p.get_volumes())?;
    writeln!(w, "{S4}Volumes failed: {}", p.get_failed())?;
    writeln!(w, "{S4}Slices in total: {}", p.get_slices())?;
    writeln!(w, "{S4}Transform total time: {} us", p.get_transform_time_us())?;
    writeln!(
        w,
        "{S4}Throughput: {} slices/s",
        f64_to_display(p.get_slices_per_sec())
    )?;
    writeln!(w, "{S4}Total machine time: {} us", p.get_real_time_us())?;
    writeln!(w, "{S4}Checked against brute force: {}", p.get_checked())?;
    let err = p.get_max_abs_err().map(f64::from);
    writeln!(w, "{S4}Max absolute error: {}", f64_to_display(err))?;
    let t = p.get_most_time_consuming().map(|d| d.as_micros() as u64);
    write!(w, "{S4}Most time-consuming volume costs {} us", u64_to_display(t))?;
    Ok(())
}

/// 消融实验最终结果.
pub struct AblationResult {
    data: Vec<(&'static str, Profile)>,
}

impl AblationResult {
    pub fn from_iter<I: IntoIterator<Item = (&'static str, Profile)>>(it: I) -> Self {
        Self {
            data: it.into_iter().collect(),
        }
    }

    /// 分析运行结果.
    pub fn analyze(&self) -> io::Result<()> {
        utils::sep();
        let mut buf = Vec::with_capacity(512);

        for (key, profile) in self.data.iter() {
            describe_into(key, profile, &mut buf)?;
            println!("{}", String::from_utf8_lossy(&buf));
            buf.clear();

            utils::sep();
        }
        Ok(())
    }

    /// 是否所有后端的所有体数据都变换成功, 且误差不超过 `tol`?
    pub fn is_success(&self, tol: f32) -> bool {
        self.data.iter().all(|(_, p)| {
            p.get_failed() == 0 && p.get_max_abs_err().map_or(true, |e| e <= tol)
        })
    }
}
