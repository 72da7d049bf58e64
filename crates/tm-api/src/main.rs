#[tokio::main]
async fn main() -> Result<(), tm_api::error::ApiError> {
    tm_api::run().await
}
