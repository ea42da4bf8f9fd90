use viz_core::SignalSource;
use web_sys as web;

/// Media element routed through an `AnalyserNode` to the speakers.
pub struct AnalyserSource {
    ctx: web::AudioContext,
    element: web::HtmlMediaElement,
    source: Option<web::MediaElementAudioSourceNode>,
    analyser: Option<web::AnalyserNode>,
}

impl AnalyserSource {
    pub fn new(element: web::HtmlMediaElement) -> anyhow::Result<Self> {
        let ctx = web::AudioContext::new().map_err(|e| anyhow::anyhow!("AudioContext: {:?}", e))?;
        Ok(Self {
            ctx,
            element,
            source: None,
            analyser: None,
        })
    }
}

impl SignalSource for AnalyserSource {
    fn connect_analyser(&mut self, fft_size: usize) -> anyhow::Result<()> {
        let analyser = self
            .ctx
            .create_analyser()
            .map_err(|e| anyhow::anyhow!("AnalyserNode: {:?}", e))?;
        analyser.set_fft_size(fft_size as u32);

        // a media element can only ever be bound to one source node
        let source = self
            .ctx
            .create_media_element_source(&self.element)
            .map_err(|e| anyhow::anyhow!("MediaElementAudioSourceNode: {:?}", e))?;
        source
            .connect_with_audio_node(&analyser)
            .map_err(|e| anyhow::anyhow!("connect source: {:?}", e))?;
        analyser
            .connect_with_audio_node(&self.ctx.destination())
            .map_err(|e| anyhow::anyhow!("connect analyser: {:?}", e))?;
        log::info!(
            "[audio] analyser connected (fft {}, {} bins)",
            fft_size,
            analyser.frequency_bin_count()
        );
        self.source = Some(source);
        self.analyser = Some(analyser);
        Ok(())
    }

    fn resume_if_suspended(&mut self) {
        if self.ctx.state() == web::AudioContextState::Suspended {
            log::info!("[audio] resuming suspended context");
            let _ = self.ctx.resume();
        }
    }

    fn read_byte_frequency_data(&mut self, out: &mut [u8]) {
        if let Some(analyser) = &self.analyser {
            analyser.get_byte_frequency_data(out);
        }
    }
}

impl Drop for AnalyserSource {
    fn drop(&mut self) {
        // browsers cap the number of live contexts
        if self.ctx.state() != web::AudioContextState::Closed {
            let _ = self.ctx.close();
        }
    }
}
