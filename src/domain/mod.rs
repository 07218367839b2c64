// Domain layer. One subdirectory per event domain; sibling services (trip,
// locale, chat) own their own logs and only see ours over the transports.

pub mod user_events;
