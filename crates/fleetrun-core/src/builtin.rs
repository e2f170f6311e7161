//! Built-in executors
//!
//! `SysInfoExecutor` collects basic identification, `MetricsExecutor`
//! collects CPU/memory/disk/uptime metrics with typed records.

use serde_json::{Value, json};

use crate::executor::Executor;

/// Collects basic system identification from every host
#[derive(Debug, Clone, Copy, Default)]
pub struct SysInfoExecutor;

impl Executor for SysInfoExecutor {
    fn commands(&self) -> Vec<String> {
        vec![
            "hostname".to_string(),
            "uname -a".to_string(),
            "uptime".to_string(),
        ]
    }

    fn parse(&self, command: &str, stdout: &str, stderr: &str, _exit_code: i32) -> Value {
        let stderr = stderr.trim();
        json!({
            "command": command,
            "output": stdout.trim(),
            "error": if stderr.is_empty() { Value::Null } else { Value::from(stderr) },
        })
    }
}

/// Collects CPU, memory, disk, and uptime metrics
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsExecutor;

impl Executor for MetricsExecutor {
    fn commands(&self) -> Vec<String> {
        vec![
            // CPU count
            "cat /proc/cpuinfo | grep processor | wc -l".to_string(),
            // Memory info
            "free -m | grep Mem".to_string(),
            // Root disk usage
            "df -h / | tail -1".to_string(),
            // Uptime
            "uptime | awk '{print $3,$4}'".to_string(),
        ]
    }

    fn parse(&self, command: &str, stdout: &str, stderr: &str, exit_code: i32) -> Value {
        if exit_code != 0 {
            let stderr = stderr.trim();
            return parse_failure(if stderr.is_empty() {
                "command failed"
            } else {
                stderr
            });
        }

        let output = stdout.trim();

        if command.contains("cpuinfo") {
            parse_cpu_count(output)
        } else if command.contains("free -m") {
            parse_memory(output)
        } else if command.contains("df -h") {
            parse_disk(output)
        } else if command.contains("uptime") {
            json!({ "metric": "uptime", "value": output })
        } else {
            json!({ "output": output })
        }
    }
}

fn parse_failure(reason: &str) -> Value {
    json!({ "error": reason, "success": false })
}

fn parse_cpu_count(output: &str) -> Value {
    match output.parse::<u64>() {
        Ok(count) => json!({ "metric": "cpu_count", "value": count, "unit": "cores" }),
        Err(_) => parse_failure("failed to parse CPU count"),
    }
}

/// Parse `free -m` output: `Mem: total used free shared buff/cache available`
fn parse_memory(output: &str) -> Value {
    let parts: Vec<&str> = output.split_whitespace().collect();

    let parsed = (|| {
        let total_mb: u64 = parts.get(1)?.parse().ok()?;
        let used_mb: u64 = parts.get(2)?.parse().ok()?;
        let available_mb: u64 = parts.last()?.parse().ok()?;
        Some((total_mb, used_mb, available_mb))
    })();

    match parsed {
        Some((total_mb, used_mb, available_mb)) => {
            let used_percent = if total_mb > 0 {
                #[allow(clippy::cast_precision_loss)]
                let pct = used_mb as f64 / total_mb as f64 * 100.0;
                (pct * 10.0).round() / 10.0
            } else {
                0.0
            };

            json!({
                "metric": "memory",
                "total_mb": total_mb,
                "used_mb": used_mb,
                "available_mb": available_mb,
                "used_percent": used_percent,
                "unit": "MB",
            })
        }
        None => parse_failure("failed to parse memory info"),
    }
}

/// Parse `df -h` output: `filesystem size used avail use% mounted`
fn parse_disk(output: &str) -> Value {
    let parts: Vec<&str> = output.split_whitespace().collect();

    let parsed = (|| {
        let size = *parts.get(1)?;
        let used = *parts.get(2)?;
        let available = *parts.get(3)?;
        let used_percent: u64 = parts.get(4)?.trim_end_matches('%').parse().ok()?;
        Some((size, used, available, used_percent))
    })();

    match parsed {
        Some((size, used, available, used_percent)) => json!({
            "metric": "disk_usage",
            "size": size,
            "used": used,
            "available": available,
            "used_percent": used_percent,
        }),
        None => parse_failure("failed to parse disk usage"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sysinfo_commands_are_ordered() {
        let commands = SysInfoExecutor.commands();
        assert_eq!(commands, vec!["hostname", "uname -a", "uptime"]);
        // deterministic across calls
        assert_eq!(commands, SysInfoExecutor.commands());
    }

    #[test]
    fn test_sysinfo_parse() {
        let record = SysInfoExecutor.parse("hostname", "box1\n", "", 0);
        assert_eq!(record["output"], "box1");
        assert_eq!(record["error"], Value::Null);

        let with_err = SysInfoExecutor.parse("uptime", "", "command not found\n", 127);
        assert_eq!(with_err["error"], "command not found");
    }

    #[test]
    fn test_metrics_cpu_count() {
        let cmd = "cat /proc/cpuinfo | grep processor | wc -l";
        let record = MetricsExecutor.parse(cmd, "8\n", "", 0);
        assert_eq!(record["metric"], "cpu_count");
        assert_eq!(record["value"], 8);
    }

    #[test]
    fn test_metrics_memory() {
        let record = MetricsExecutor.parse(
            "free -m | grep Mem",
            "Mem:          15852        6348        1203         812        8300        8362\n",
            "",
            0,
        );
        assert_eq!(record["metric"], "memory");
        assert_eq!(record["total_mb"], 15852);
        assert_eq!(record["used_mb"], 6348);
        assert_eq!(record["available_mb"], 8362);
        assert_eq!(record["used_percent"], 40.0);
    }

    #[test]
    fn test_metrics_disk() {
        let record = MetricsExecutor.parse(
            "df -h / | tail -1",
            "/dev/sda1        98G   42G   51G  46% /\n",
            "",
            0,
        );
        assert_eq!(record["metric"], "disk_usage");
        assert_eq!(record["size"], "98G");
        assert_eq!(record["used_percent"], 46);
    }

    #[test]
    fn test_metrics_parse_is_total() {
        // garbage output degrades to an error record, never a panic
        let record = MetricsExecutor.parse("free -m | grep Mem", "not numbers at all", "", 0);
        assert_eq!(record["success"], false);
        assert!(record["error"].is_string());

        // non-zero exit carries stderr through
        let record = MetricsExecutor.parse("df -h / | tail -1", "", "df: /: no such device", 1);
        assert_eq!(record["error"], "df: /: no such device");
    }
}
