use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};

/// Read a JSON or YAML file (chosen by extension) into a typed struct.
pub fn read_config<T: DeserializeOwned>(path: &str) -> Result<T, Box<dyn std::error::Error>> {
    let canonical = resolve_path(path)?;
    let contents = fs::read_to_string(&canonical)
        .map_err(|e| format!("Failed to read '{}': {}", canonical.display(), e))?;

    let is_yaml = canonical
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| matches!(ext.to_ascii_lowercase().as_str(), "yaml" | "yml"))
        .unwrap_or(false);

    let value: T = if is_yaml {
        serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse '{}': {}", canonical.display(), e))?
    } else {
        serde_json::from_str(&contents)
            .map_err(|e| format!("Failed to parse '{}': {}", canonical.display(), e))?
    };
    tracing::debug!(path = %canonical.display(), yaml = is_yaml, "loaded config file");
    Ok(value)
}

/// Resolve and validate the path.
fn resolve_path(path: &str) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let p = Path::new(path);
    let canonical = if p.is_absolute() {
        p.to_path_buf()
    } else {
        std::env::current_dir()?.join(p)
    };

    if !canonical.exists() {
        return Err(format!("File not found: {}", canonical.display()).into());
    }

    if !canonical.is_file() {
        return Err(format!("Not a file: {}", canonical.display()).into());
    }

    Ok(canonical)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use valuation_reasoner_core::valuation::{Assumptions, CashFlowModel};

    #[test]
    fn test_read_yaml_assumptions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("assumptions.yaml");
        fs::write(
            &path,
            r#"
company_name: Yaml Co
base_revenue: 250
revenue_growth_rates: [0.08, 0.06]
ebitda_margin: 0.3
tax_rate: 0.21
cash_flow:
  method: reinvestment
  reinvestment_rate: 0.25
wacc: 0.09
terminal_growth_rate: 0.02
forecast_years: 4
exit_multiple: 9
"#,
        )
        .unwrap();

        let a: Assumptions = read_config(path.to_str().unwrap()).unwrap();
        assert_eq!(a.company_name, "Yaml Co");
        assert_eq!(a.forecast_years, 4);
        assert_eq!(a.wacc, dec!(0.09));
        assert_eq!(
            a.cash_flow,
            CashFlowModel::Reinvestment {
                reinvestment_rate: dec!(0.25)
            }
        );
    }

    #[test]
    fn test_read_json_assumptions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("assumptions.json");
        let json = serde_json::to_string(&Assumptions::default()).unwrap();
        fs::write(&path, json).unwrap();

        let a: Assumptions = read_config(path.to_str().unwrap()).unwrap();
        assert_eq!(a, Assumptions::default());
    }

    #[test]
    fn test_missing_file() {
        let err = read_config::<Assumptions>("/definitely/not/here.json").unwrap_err();
        assert!(err.to_string().contains("File not found"));
    }
}
