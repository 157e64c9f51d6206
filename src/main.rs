use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    nowcapital_connector::api::run().await
}
