//! Paginated review collection
//!
//! Walks the numbered pages of one review view, appending items to the
//! record until the view runs dry or the cap is reached. A resume cursor
//! makes the walk click forward to the first unharvested page before any
//! item is read.

use crate::catalog::{Record, ResumeCursor};
use crate::extract::FieldExtractor;
use crate::render::RenderClient;
use crate::state::ViewState;
use std::time::Duration;

/// Receives progress after every completed page
pub trait PageSink: Send {
    /// Called once every item on `page` has been appended to `record`
    fn page_completed(&mut self, record: &Record, page: u32);
}

/// Collects items from the view currently shown by the client
pub struct PageCollector<'a> {
    extractor: &'a dyn FieldExtractor,
    click_settle: Duration,
}

impl<'a> PageCollector<'a> {
    pub fn new(extractor: &'a dyn FieldExtractor, click_settle: Duration) -> Self {
        Self {
            extractor,
            click_settle,
        }
    }

    /// Harvests up to `cap` items into `record`
    ///
    /// # Arguments
    ///
    /// * `client` - Session showing page 1 of the view
    /// * `record` - Record the items are appended to
    /// * `cap` - Maximum number of items to add
    /// * `seed` - Last page completed by an earlier run, if resuming
    /// * `sink` - Notified after each fully harvested page
    ///
    /// # Returns
    ///
    /// The number of items added
    pub async fn collect(
        &self,
        client: &mut dyn RenderClient,
        record: &mut Record,
        cap: usize,
        seed: Option<ResumeCursor>,
        sink: &mut dyn PageSink,
    ) -> usize {
        let mut page = 1;
        let mut collected = 0;
        let mut state = match seed {
            _ if cap == 0 => ViewState::Exhausted,
            Some(cursor) => {
                tracing::info!("Resuming after page {}", cursor.page());
                ViewState::Seeking {
                    target: cursor.next_page(),
                }
            }
            None => ViewState::Collecting,
        };

        while !state.is_terminal() {
            tracing::debug!("Page {} in state {}", page, state);
            state = match state {
                ViewState::Seeking { target } if page >= target => ViewState::Collecting,
                ViewState::Seeking { target } => {
                    if self.advance(client, page).await {
                        page += 1;
                        ViewState::Seeking { target }
                    } else {
                        tracing::warn!(
                            "Could not reach page {}, collecting from page {}",
                            target,
                            page
                        );
                        ViewState::Collecting
                    }
                }
                ViewState::Collecting => {
                    let harvested = self.harvest_page(&*client, record, cap - collected).await;
                    collected += harvested.added;

                    if harvested.added == 0 {
                        tracing::debug!("No items on page {}", page);
                        ViewState::Exhausted
                    } else {
                        if harvested.added == harvested.present {
                            sink.page_completed(record, page);
                        }
                        if collected >= cap {
                            tracing::debug!("Reached the cap of {} items", cap);
                            ViewState::Exhausted
                        } else if self.advance(client, page).await {
                            page += 1;
                            ViewState::Collecting
                        } else {
                            ViewState::Exhausted
                        }
                    }
                }
                ViewState::Exhausted => ViewState::Exhausted,
            };
        }

        collected
    }

    /// Appends at most `room` items from the current page
    async fn harvest_page(
        &self,
        client: &dyn RenderClient,
        record: &mut Record,
        room: usize,
    ) -> Harvested {
        let elements = match client.find_many(None, &self.extractor.item_locator()).await {
            Ok(elements) => elements,
            Err(e) => {
                tracing::warn!("Could not list reviews: {}", e);
                return Harvested::default();
            }
        };

        let mut added = 0;
        for element in elements.iter().take(room) {
            record.comments.push(self.extractor.item(client, element).await);
            added += 1;
        }

        Harvested {
            present: elements.len(),
            added,
        }
    }

    /// Clicks the control for the page after `page`
    async fn advance(&self, client: &mut dyn RenderClient, page: u32) -> bool {
        let wanted = (page + 1).to_string();
        let buttons = match client
            .find_many(None, &self.extractor.page_button_locator())
            .await
        {
            Ok(buttons) => buttons,
            Err(e) => {
                tracing::debug!("Page controls unavailable: {}", e);
                return false;
            }
        };

        for button in buttons {
            let Ok(text) = client.text(&button).await else {
                continue;
            };
            if text.trim() != wanted {
                continue;
            }
            return match client.click(&button).await {
                Ok(()) => {
                    tokio::time::sleep(self.click_settle).await;
                    true
                }
                Err(e) => {
                    tracing::warn!("Could not open page {}: {}", wanted, e);
                    false
                }
            };
        }

        tracing::debug!("No control for page {}", wanted);
        false
    }
}

#[derive(Debug, Default)]
struct Harvested {
    present: usize,
    added: usize,
}
