mod mock_source;
mod scan_pipeline;
