//! Channel suggestion from caller reachability

use omniline_core::Channel;

/// What we know about how a caller can be reached.
#[derive(Debug, Clone, Default)]
pub struct ChannelContext {
    pub phone: Option<String>,
    pub email: Option<String>,
    pub whatsapp_available: bool,
    /// Whether the phone line accepts a live call right now.
    pub callable: bool,
}

/// Pick the richest channel the caller can actually be reached on.
/// Spoken beats written, immediate beats queued.
pub fn suggested_channel(ctx: &ChannelContext) -> Channel {
    if ctx.phone.is_some() && ctx.callable {
        return Channel::Voice;
    }
    if ctx.phone.is_some() {
        return Channel::Sms;
    }
    if ctx.whatsapp_available {
        return Channel::Whatsapp;
    }
    if ctx.email.is_some() {
        return Channel::Email;
    }
    Channel::Voice
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_callable_phone_means_voice() {
        let ctx = ChannelContext {
            phone: Some("+33612345678".into()),
            callable: true,
            ..Default::default()
        };
        assert_eq!(suggested_channel(&ctx), Channel::Voice);
    }

    #[test]
    fn test_uncallable_phone_falls_back_to_sms() {
        let ctx = ChannelContext {
            phone: Some("+33612345678".into()),
            callable: false,
            whatsapp_available: true,
            ..Default::default()
        };
        assert_eq!(suggested_channel(&ctx), Channel::Sms);
    }

    #[test]
    fn test_whatsapp_then_email() {
        let ctx = ChannelContext {
            whatsapp_available: true,
            email: Some("a@b.fr".into()),
            ..Default::default()
        };
        assert_eq!(suggested_channel(&ctx), Channel::Whatsapp);

        let ctx = ChannelContext {
            email: Some("a@b.fr".into()),
            ..Default::default()
        };
        assert_eq!(suggested_channel(&ctx), Channel::Email);
    }

    #[test]
    fn test_nothing_known_defaults_to_voice() {
        assert_eq!(suggested_channel(&ChannelContext::default()), Channel::Voice);
    }
}
