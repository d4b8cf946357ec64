// src/system/disk.rs

//! Physical disk inventory with SMART failure prediction. Drives come from
//! `Win32_DiskDrive`; predictions come from the storage driver's
//! `MSStorageDriver_FailurePredictStatus` class, which many NVMe drivers do
//! not register at all.

use anyhow::Result;

/// A physical disk and its SMART failure prediction. `smart_ok: None` means
/// the storage driver exposes no prediction for the device.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct DiskHealth {
    pub device_id: String,
    pub model: String,
    pub size_bytes: Option<u64>,
    pub smart_ok: Option<bool>,
}

#[cfg(windows)]
const DRIVE_QUERY: &str =
    r#"Get-CimInstance Win32_DiskDrive | ForEach-Object { "$($_.DeviceID)|$($_.Model)|$($_.Size)" }"#;

#[cfg(windows)]
const PREDICT_QUERY: &str = r#"Get-CimInstance -Namespace root\wmi -ClassName MSStorageDriver_FailurePredictStatus -ErrorAction SilentlyContinue | ForEach-Object { "$($_.InstanceName)|$($_.PredictFailure)" }"#;

/// Parses `DeviceID|Model|Size` lines.
pub fn parse_drive_lines(output: &str) -> Vec<DiskHealth> {
    output
        .lines()
        .filter_map(|line| {
            let mut parts = line.trim().splitn(3, '|');
            let device_id = parts.next()?.trim().to_string();
            let model = parts.next()?.trim().to_string();
            if device_id.is_empty() {
                return None;
            }
            let size_bytes = parts.next().and_then(|size| size.trim().parse().ok());
            Some(DiskHealth {
                device_id,
                model,
                size_bytes,
                smart_ok: None,
            })
        })
        .collect()
}

/// Parses `InstanceName|PredictFailure` lines into (instance, failure
/// predicted) pairs. PowerShell prints the flag as True/False; raw WMI dumps
/// show 1/0. Both forms are understood.
pub fn parse_predict_lines(output: &str) -> Vec<(String, bool)> {
    output
        .lines()
        .filter_map(|line| {
            let (instance, predict) = line.trim().split_once('|')?;
            let predicted = match predict.trim().to_lowercase().as_str() {
                "true" | "1" => true,
                "false" | "0" => false,
                _ => return None,
            };
            Some((instance.trim().to_string(), predicted))
        })
        .collect()
}

/// Trailing run of digits. Lines up `\\.\PHYSICALDRIVE<n>` device ids with
/// `..._<n>` storage driver instance names.
fn trailing_index(text: &str) -> Option<u32> {
    let reversed: String = text
        .trim_end()
        .chars()
        .rev()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    let digits: String = reversed.chars().rev().collect();
    digits.parse().ok()
}

/// Attaches failure predictions to drives by disk index. The instance paths
/// never contain the Win32 device id itself, but both end in the index.
pub fn correlate(mut drives: Vec<DiskHealth>, predictions: &[(String, bool)]) -> Vec<DiskHealth> {
    for drive in &mut drives {
        let Some(index) = trailing_index(&drive.device_id) else {
            continue;
        };
        for (instance, predicted) in predictions {
            if trailing_index(instance) == Some(index) {
                drive.smart_ok = Some(!*predicted);
                break;
            }
        }
    }
    drives
}

/// Queries the host's disks and their SMART predictions.
#[cfg(windows)]
pub fn collect_disk_health() -> Result<Vec<DiskHealth>> {
    use crate::utils::command::run_powershell;

    let drives = parse_drive_lines(&run_powershell(DRIVE_QUERY)?);
    let predictions = match run_powershell(PREDICT_QUERY) {
        Ok(output) => parse_predict_lines(&output),
        Err(e) => {
            tracing::debug!("No SMART prediction data: {:?}", e);
            Vec::new()
        }
    };
    Ok(correlate(drives, &predictions))
}

#[cfg(not(windows))]
pub fn collect_disk_health() -> Result<Vec<DiskHealth>> {
    anyhow::bail!("disk health is only available on Windows")
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn drive_lines_parse_model_and_size() {
        let output = "\\\\.\\PHYSICALDRIVE0|Samsung SSD 980 1TB|1000204886016\n\
                      \\\\.\\PHYSICALDRIVE1|WDC WD40EZRZ-00GXCB0|4000787030016\n";

        let drives = parse_drive_lines(output);

        assert_eq!(drives.len(), 2);
        assert_eq!(drives[0].device_id, "\\\\.\\PHYSICALDRIVE0");
        assert_eq!(drives[0].model, "Samsung SSD 980 1TB");
        assert_eq!(drives[0].size_bytes, Some(1000204886016));
        assert_eq!(drives[0].smart_ok, None);
        assert_eq!(drives[1].device_id, "\\\\.\\PHYSICALDRIVE1");
    }

    #[test]
    fn missing_sizes_are_tolerated() {
        let drives = parse_drive_lines("\\\\.\\PHYSICALDRIVE0|Msft Virtual Disk|\n");
        assert_eq!(drives.len(), 1);
        assert_eq!(drives[0].size_bytes, None);
    }

    #[test]
    fn predict_lines_tolerate_boolean_and_numeric_forms() {
        let parsed = parse_predict_lines("X_0|False\nY_1|True\nZ_2|0\nnot a record\n");
        assert_eq!(
            parsed,
            vec![
                ("X_0".to_string(), false),
                ("Y_1".to_string(), true),
                ("Z_2".to_string(), false),
            ]
        );
    }

    #[test]
    fn predictions_attach_by_disk_index() {
        let drives = parse_drive_lines(
            "\\\\.\\PHYSICALDRIVE0|Samsung SSD 980|1000204886016\n\
             \\\\.\\PHYSICALDRIVE1|WDC WD40EZRZ|4000787030016\n",
        );
        let predictions = vec![
            (
                "SCSI\\Disk&Ven_NVMe&Prod_Samsung_SSD_980\\5&107bb22&0&000000_0".to_string(),
                false,
            ),
            (
                "SCSI\\Disk&Ven_&Prod_WDC_WD40EZRZ\\4&2617383&0&020000_1".to_string(),
                true,
            ),
        ];

        let drives = correlate(drives, &predictions);

        assert_eq!(drives[0].smart_ok, Some(true));
        assert_eq!(drives[1].smart_ok, Some(false));
    }

    #[test]
    fn unmatched_drives_stay_unknown() {
        let drives = correlate(
            parse_drive_lines("\\\\.\\PHYSICALDRIVE0|Samsung SSD 980|1000204886016\n"),
            &[],
        );
        assert_eq!(drives[0].smart_ok, None);
    }
}
