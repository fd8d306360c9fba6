use std::env;
fn main() {
    dotenvy::dotenv().ok();
    println!("cargo:rerun-if-changed=.env");

    let required_vars = ["DATABASE_URL"];
    let recommended_vars = ["DATAGOLF_API_KEY", "ADMIN_KEY"];

    for &var in &required_vars {
        if env::var(var).is_err() {
            println!("cargo:warning=Required environment variable {} is not set.", var);
        }
    }
    for &var in &recommended_vars {
        if env::var(var).is_err() {
            println!("cargo:warning={} is not set, the matching feature will be disabled.", var);
        }
    }
}
