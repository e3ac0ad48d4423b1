// AnalystConfig is the one piece of the legacy agent stack still load-bearing:
// strategies/ and risk_management/sizing_engine build off it.
pub mod analyst_config;
