pub mod price_refresh_sync;
