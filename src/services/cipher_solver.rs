//! 解密挑战求解 - 业务能力层
//!
//! 挑战载荷里的"查找"其实就是按下标取符号：目标序列中的每个值
//! 都是 vault 的下标（0..len-1 连续区间），所以直接做带边界检查的
//! 索引访问即可，不存在比较语义。

use tracing::warn;

/// 求解挑战：按 targets 给出的顺序，逐个取 vault 中对应下标的符号拼接
///
/// 越界下标不产生字符，只记一条可恢复的警告；因此输出长度
/// 不超过 targets 的长度。纯函数，同样的输入永远得到同样的输出。
pub fn solve(vault: &[char], targets: &[i64]) -> String {
    let mut code = String::with_capacity(targets.len());

    for &target in targets {
        if target >= 0 && (target as usize) < vault.len() {
            code.push(vault[target as usize]);
        } else {
            warn!("⚠️ 目标下标 {} 超出 vault 范围 [0, {})，跳过", target, vault.len());
        }
    }

    code
}
