use std::sync::Arc;
use std::time::Duration;

use super::test_helpers::*;
use crate::config::Config;
use crate::delivery::ChannelSink;
use crate::error::Error;
use crate::fetch::ByteFetcher;
use crate::types::{Event, Lifecycle};

use super::ThumbnailDownloader;
