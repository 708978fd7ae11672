// Public modules
pub mod card_payload;
pub mod carousel_payload;
pub mod choice;
pub mod choice_payload;
pub mod conversation;
pub mod conversation_event;
pub mod conversation_list_response;
pub mod conversation_response;
pub mod created_user;
pub mod image_payload;
pub mod message;
pub mod message_list_response;
pub mod message_payload;
pub mod message_response;
pub mod other_payload;
pub mod text_payload;
pub mod user;
pub mod user_response;

// Re-exports
pub use card_payload::CardPayload;
pub use carousel_payload::CarouselPayload;
pub use choice::Choice;
pub use choice_payload::ChoicePayload;
pub use conversation::Conversation;
pub use conversation_event::{ConversationEvent, ConversationEventData};
pub use conversation_list_response::ConversationListResponse;
pub use conversation_response::ConversationResponse;
pub use created_user::CreatedUser;
pub use image_payload::ImagePayload;
pub use message::Message;
pub use message_list_response::MessageListResponse;
pub use message_payload::MessagePayload;
pub use message_response::MessageResponse;
pub use other_payload::OtherPayload;
pub use text_payload::TextPayload;
pub use user::User;
pub use user_response::UserResponse;
